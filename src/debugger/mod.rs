mod command;
mod source;

use self::command::Command;
use self::source::{Source, SourceRead};
use crate::device::Device;
use crate::output::{Condition, Output};
use crate::runtime::{Processor, RuntimeError, Status};
use crate::dprintln;

/// Leave this as a struct, in case more options are added in the future. Plus it is more explicit.
#[derive(Debug, Default)]
pub struct DebuggerOptions {
    /// Commands to run instead of reading from stdin, separated by `;` or newlines.
    pub command: Option<String>,
}

/// Steps a [`Processor`] under control of user commands.
pub struct Debugger {
    /// Loaded words, for `reset`.
    initial_words: Vec<String>,
    status: DebugStatus,
    command_source: Source,
    /// Amount of instructions executed since last command.
    instruction_count: u32,
}

/// The current status of the debugger execution loop.
#[derive(Debug, Default)]
enum DebugStatus {
    /// Keep executing user commands, until one changes the debugger status.
    #[default]
    WaitForAction,
    /// Execute `count` more instructions, stopping early at `HALT`.
    Step { count: u32 },
    /// Execute all instructions until `HALT`.
    Continue,
    /// Leave the program unfinished.
    Quit,
}

impl Debugger {
    pub fn new(opts: DebuggerOptions, initial_words: Vec<String>) -> Self {
        Self {
            initial_words,
            status: DebugStatus::default(),
            command_source: Source::from(opts.command),
            instruction_count: 0,
        }
    }

    /// Drive `processor` until it halts or the user quits.
    ///
    /// The processor must already hold the program. A runtime error ends the session.
    pub fn run<D: Device>(&mut self, processor: &mut Processor<D>) -> Result<(), RuntimeError> {
        loop {
            match &mut self.status {
                DebugStatus::Quit => {
                    dprintln!(Always, "Stopped before program completion.");
                    return Ok(());
                }
                DebugStatus::WaitForAction => self.next_action(processor)?,
                DebugStatus::Step { count } => {
                    *count -= 1;
                    if *count == 0 {
                        self.status = DebugStatus::WaitForAction;
                    }
                    if self.execute(processor)? == Status::Halted {
                        break;
                    }
                }
                DebugStatus::Continue => {
                    if self.execute(processor)? == Status::Halted {
                        break;
                    }
                }
            }
        }
        self.report_count();
        dprintln!(Always, "Program halted.");
        Ok(())
    }

    fn execute<D: Device>(&mut self, processor: &mut Processor<D>) -> Result<Status, RuntimeError> {
        self.instruction_count += 1;
        processor.step()
    }

    fn report_count(&mut self) {
        if self.instruction_count > 0 {
            dprintln!(
                Always,
                "Executed {} instruction{}.",
                self.instruction_count,
                if self.instruction_count == 1 { "" } else { "s" },
            );
            self.instruction_count = 0;
        }
    }

    fn next_action<D: Device>(&mut self, processor: &mut Processor<D>) -> Result<(), RuntimeError> {
        self.report_count();
        dprintln!(
            Sometimes,
            "Program counter at: {:02}.",
            processor.registers().pc
        );

        // Convert `EOF` to `continue` command
        let command = self.next_command().unwrap_or(Command::Continue);

        match command {
            Command::Quit => self.status = DebugStatus::Quit,
            Command::Help => {
                dprintln!(Always, "\n{}", include_str!("./help.txt"));
            }
            Command::Step { count } => self.status = DebugStatus::Step { count },
            Command::Continue => {
                self.status = DebugStatus::Continue;
                dprintln!(Sometimes, "Continuing...");
            }
            Command::Registers => {
                dprintln!(Sometimes, "Registers:");
                Output::Debugger(Condition::Always).print_registers(processor.registers());
            }
            Command::Memory => {
                dprintln!(Sometimes, "Memory:");
                Output::Debugger(Condition::Always).print_memory(processor.memory().cells());
            }
            Command::Reset => {
                processor.load(self.initial_words.iter().cloned())?;
                dprintln!(Always, "Reset program to initial state.");
            }
        }
        Ok(())
    }

    /// Returns `None` on EOF.
    fn next_command(&mut self) -> Option<Command> {
        // Loop until valid command or EOF
        loop {
            let line = self.command_source.read()?.trim();
            match Command::try_from(line) {
                Ok(command) => return Some(command),
                Err(error) => {
                    dprintln!(Always, "{}", error);
                    dprintln!(Always, "Type `help` for a list of commands.");
                }
            }
        }
    }
}
