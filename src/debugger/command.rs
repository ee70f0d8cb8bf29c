use std::error::Error;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    /// Execute `count` cycles. An empty line is `step 1`.
    Step { count: u32 },
    Continue,
    Registers,
    Memory,
    Reset,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CommandName {
    Help,
    Step,
    Continue,
    Registers,
    Memory,
    Reset,
    Quit,
}

/// Error parsing a command.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandError {
    Invalid { command_name: String },
    InvalidCount { string: String },
    TooManyArguments { command_name: &'static str },
}

#[rustfmt::skip]
const COMMANDS: &[(CommandName, &[&str])] = &[
    (CommandName::Help,      &["help", "--help", "h", "-h"]),
    (CommandName::Step,      &["step", "s"]),
    (CommandName::Continue,  &["continue", "cont", "c"]),
    (CommandName::Registers, &["registers", "reg", "r"]),
    (CommandName::Memory,    &["memory", "mem", "m"]),
    (CommandName::Reset,     &["reset"]),
    (CommandName::Quit,      &["quit", "q"]),
];

impl CommandName {
    fn as_str(self) -> &'static str {
        COMMANDS
            .iter()
            .find(|(name, _)| *name == self)
            .map_or("", |(_, candidates)| candidates[0])
    }
}

/// Returns the command with an alias matching `name` (case insensitive).
fn find_name_match(name: &str) -> Option<CommandName> {
    COMMANDS
        .iter()
        .find(|(_, candidates)| {
            candidates
                .iter()
                .any(|candidate| name.eq_ignore_ascii_case(candidate))
        })
        .map(|(command, _)| *command)
}

impl TryFrom<&str> for Command {
    type Error = CommandError;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let mut args = line.split_whitespace();
        let Some(command_name) = args.next() else {
            return Ok(Command::Step { count: 1 });
        };
        let name = find_name_match(command_name).ok_or_else(|| CommandError::Invalid {
            command_name: command_name.to_owned(),
        })?;

        let command = match name {
            CommandName::Step => {
                let count = match args.next() {
                    None => 1,
                    Some(string) => string
                        .parse::<u32>()
                        .ok()
                        .filter(|count| *count > 0)
                        .ok_or_else(|| CommandError::InvalidCount {
                            string: string.to_owned(),
                        })?,
                };
                Command::Step { count }
            }
            CommandName::Help => Command::Help,
            CommandName::Continue => Command::Continue,
            CommandName::Registers => Command::Registers,
            CommandName::Memory => Command::Memory,
            CommandName::Reset => Command::Reset,
            CommandName::Quit => Command::Quit,
        };

        if args.next().is_some() {
            return Err(CommandError::TooManyArguments {
                command_name: name.as_str(),
            });
        }
        Ok(command)
    }
}

impl Error for CommandError {}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { command_name } => write!(f, "Not a command: `{}`.", command_name),
            Self::InvalidCount { string } => {
                write!(f, "Step count must be a positive integer, not `{}`.", string)
            }
            Self::TooManyArguments { command_name } => {
                write!(f, "Too many arguments for command `{}`.", command_name)
            }
        }
    }
}
