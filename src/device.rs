use std::collections::VecDeque;
use std::io::{self, stdin, stdout, BufRead, IsTerminal, Write};

use colored::Colorize;
use console::Term;

/// External input and output of the processor, used by `READ` and `WRITE`.
pub trait Device {
    /// Read one value to be stored at `address`. `None` indicates end of input.
    fn read(&mut self, address: u8) -> io::Result<Option<String>>;
    /// Emit the value stored at `address`.
    fn write(&mut self, address: u8, value: &str) -> io::Result<()>;
}

/// Standard input and output.
#[derive(Debug, Default)]
pub struct Console {
    minimal: bool,
}

impl Console {
    pub fn new(minimal: bool) -> Self {
        Console { minimal }
    }
}

impl Device for Console {
    fn read(&mut self, address: u8) -> io::Result<Option<String>> {
        if !self.minimal {
            print!("{} ", format!("Enter value for ({address:02}):").cyan());
            stdout().flush()?;
        }
        if stdin().is_terminal() {
            return Term::stdout().read_line().map(Some);
        }
        let mut line = String::new();
        if stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_owned()))
    }

    fn write(&mut self, address: u8, value: &str) -> io::Result<()> {
        let mut out = stdout().lock();
        if self.minimal {
            writeln!(out, "{value}")?;
        } else {
            let label = format!("Data from memory address ({address:02}):");
            writeln!(out, "{} {}", label.cyan(), value)?;
        }
        out.flush()
    }
}

/// In-memory device with queued input, collecting all output.
#[derive(Debug, Default)]
pub struct Buffered {
    input: VecDeque<String>,
    output: Vec<String>,
}

impl Buffered {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<I, S>(input: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Buffered {
            input: input.into_iter().map(Into::into).collect(),
            output: Vec::new(),
        }
    }

    pub fn push_input(&mut self, value: impl Into<String>) {
        self.input.push_back(value.into());
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }
}

impl Device for Buffered {
    fn read(&mut self, _address: u8) -> io::Result<Option<String>> {
        Ok(self.input.pop_front())
    }

    fn write(&mut self, _address: u8, value: &str) -> io::Result<()> {
        self.output.push(value.to_owned());
        Ok(())
    }
}

impl<D: Device + ?Sized> Device for &mut D {
    fn read(&mut self, address: u8) -> io::Result<Option<String>> {
        (**self).read(address)
    }

    fn write(&mut self, address: u8, value: &str) -> io::Result<()> {
        (**self).write(address, value)
    }
}
