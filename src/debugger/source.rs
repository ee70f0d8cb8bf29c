use std::io::{self, BufRead, IsTerminal, Write};

use console::{Key, Term};

use crate::dprintln;

/// Where debugger commands come from.
#[derive(Debug)]
pub enum Source {
    Argument(Argument),
    Stdin(Stdin),
    Terminal(Terminal),
}

/// Command-line argument
#[derive(Debug)]
pub struct Argument {
    buffer: String,
    /// Byte index
    cursor: usize,
}

/// Stdin which is not attached to a terminal, i.e. piped.
#[derive(Debug)]
pub struct Stdin {
    stdin: io::Stdin,
    line: Argument,
}

/// Interactive unbuffered terminal
#[derive(Debug)]
pub struct Terminal {
    term: Term,
    line: Argument,
    history: Vec<String>,
    /// Focused item in history, or new entry if index==length
    history_index: usize,
    /// Entry being typed
    buffer: String,
    /// Visible line cursor in terminal
    visible_cursor: usize,
}

pub trait SourceRead {
    /// `None` indicates EOF.
    /// Returned string slice MAY include leading or trailing whitespace.
    fn read(&mut self) -> Option<&str>;
}

impl Source {
    pub fn from(argument: Option<String>) -> Self {
        if let Some(argument) = argument {
            return Source::Argument(Argument::from(argument));
        }
        let stdin = io::stdin();
        if stdin.is_terminal() {
            return Source::Terminal(Terminal::new());
        }
        Source::Stdin(Stdin::from(stdin))
    }
}

impl SourceRead for Source {
    fn read(&mut self) -> Option<&str> {
        let command = match self {
            Self::Argument(argument) => argument.read(),
            Self::Stdin(stdin) => stdin.read(),
            Self::Terminal(terminal) => return terminal.read(),
        };
        // Echo command for non-terminal source, since it was never typed
        if let Some(command) = command {
            dprintln!(Sometimes, "\x1b[1mCommand:\x1b[0m {}", command.trim());
        }
        command
    }
}

impl Argument {
    pub fn from(source: String) -> Self {
        Self {
            buffer: source,
            cursor: 0,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.cursor >= self.buffer.len()
    }

    fn replace(&mut self, source: String) {
        self.buffer = source;
        self.cursor = 0;
    }
}

impl SourceRead for Argument {
    fn read(&mut self) -> Option<&str> {
        if self.is_exhausted() {
            return None;
        }

        // Take characters until delimiter
        let rest = &self.buffer[self.cursor..];
        let len = rest.find(['\n', ';']).unwrap_or(rest.len());
        let start = self.cursor;
        self.cursor += len + 1; // Skip delimiter

        Some(&self.buffer[start..start + len])
    }
}

impl Stdin {
    pub fn from(stdin: io::Stdin) -> Self {
        Self {
            stdin,
            line: Argument::from(String::new()),
        }
    }
}

impl SourceRead for Stdin {
    fn read(&mut self) -> Option<&str> {
        if self.line.is_exhausted() {
            let mut buffer = String::new();
            // Read errors are treated as EOF
            if self.stdin.lock().read_line(&mut buffer).ok()? == 0 {
                return None;
            }
            let buffer = buffer.trim_end_matches(['\n', '\r']);
            // Keep a blank line as one empty command
            self.line.replace(if buffer.is_empty() {
                ";".to_owned()
            } else {
                buffer.to_owned()
            });
        }
        self.line.read()
    }
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
            line: Argument::from(String::new()),
            history: Vec::new(),
            history_index: 0,
            buffer: String::new(),
            visible_cursor: 0,
        }
    }

    fn is_next(&self) -> bool {
        self.history_index >= self.history.len()
    }

    /// Entry under the cursor: either a history item or the new entry.
    fn current(&self) -> &str {
        self.history
            .get(self.history_index)
            .map_or(self.buffer.as_str(), String::as_str)
    }

    /// Copy a focused history item into the new entry before editing it.
    fn update_next(&mut self) {
        if self.is_next() {
            return;
        }
        self.buffer = self.current().to_owned();
        self.history_index = self.history.len();
    }

    fn print_prompt(&mut self) -> io::Result<()> {
        let current = self.current().to_owned();
        self.term.clear_line()?;
        write!(self.term, "\x1b[1;34mCommand: \x1b[0m{}", current)?;
        let back = current.len().saturating_sub(self.visible_cursor);
        self.term.move_cursor_left(back)?;
        self.term.flush()
    }

    /// Returns `true` once the entry is complete.
    fn read_key(&mut self) -> io::Result<bool> {
        match self.term.read_key()? {
            Key::Enter | Key::Char('\n') => {
                self.update_next();
                return Ok(true);
            }
            // Ignore ASCII control characters
            Key::Char('\x00'..='\x1f' | '\x7f') => (),
            Key::Char(ch) if ch.is_ascii() => {
                self.update_next();
                self.buffer.insert(self.visible_cursor, ch);
                self.visible_cursor += 1;
            }
            Key::Backspace => {
                self.update_next();
                if self.visible_cursor > 0 && self.visible_cursor <= self.buffer.len() {
                    self.buffer.remove(self.visible_cursor - 1);
                    self.visible_cursor -= 1;
                }
            }
            Key::ArrowLeft => self.visible_cursor = self.visible_cursor.saturating_sub(1),
            Key::ArrowRight => {
                if self.visible_cursor < self.current().len() {
                    self.visible_cursor += 1;
                }
            }
            Key::ArrowUp => {
                if self.history_index > 0 {
                    self.history_index -= 1;
                    self.visible_cursor = self.current().len();
                }
            }
            Key::ArrowDown => {
                if self.history_index < self.history.len() {
                    self.history_index += 1;
                    self.visible_cursor = self.current().len();
                }
            }
            _ => (),
        }
        Ok(false)
    }

    /// Read an entire (multi-command) line.
    fn read_line(&mut self) -> io::Result<String> {
        self.buffer.clear();
        self.visible_cursor = 0;
        loop {
            self.print_prompt()?;
            if self.read_key()? {
                break;
            }
        }
        writeln!(self.term)?;

        let line = std::mem::take(&mut self.buffer);
        if !line.trim().is_empty() && self.history.last() != Some(&line) {
            self.history.push(line.clone());
        }
        self.history_index = self.history.len();
        Ok(line)
    }
}

impl SourceRead for Terminal {
    fn read(&mut self) -> Option<&str> {
        if self.line.is_exhausted() {
            // Terminal errors are treated as EOF
            let line = self.read_line().ok()?;
            self.line.replace(if line.is_empty() { ";".to_owned() } else { line });
        }
        self.line.read()
    }
}
