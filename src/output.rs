use std::cell::RefCell;
use std::str::Chars;

use colored::{ColoredString, Colorize};

use crate::memory::Memory;
use crate::runtime::Registers;

#[macro_export]
macro_rules! dprint {
    ( $cond:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use crate::output::Condition::*;
        let s = format!(
            $fmt
            $($tt)*
        );
        crate::output::Output::Debugger($cond).print_str(&s);
    }};
    // Trigger type error if missing condition
    ( $fmt:literal $($tt:tt)* ) => {{
        crate::output::Output::Debugger($fmt);
    }};
}

#[macro_export]
macro_rules! dprintln {
    ( $cond:expr ) => {{
        #[allow(unused_imports)]
        use crate::output::Condition::*;
        crate::output::Output::Debugger($cond).print_str("\n");
    }};
    ( $cond:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use crate::output::Condition::*;
        let s = format!(
            concat!($fmt, "\n")
            $($tt)*
        );
        crate::output::Output::Debugger($cond).print_str(&s);
    }};
    // Trigger type error if missing condition
    ( $fmt:literal $($tt:tt)* ) => {{
        crate::output::Output::Debugger($fmt);
    }};
}

#[derive(Clone, Copy, Debug)]
pub enum Output {
    /// Standard output, shared with the program's own output.
    Normal,
    /// Standard error.
    Debugger(Condition),
}

/// Whether debugger output is still shown with `--minimal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Always,
    Sometimes,
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

impl Output {
    thread_local! {
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }
    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    pub fn print_str(&self, string: &str) {
        match self {
            Self::Normal => {
                if Self::is_minimal() {
                    print!("{}", Decolored::new(string).collect::<String>());
                } else {
                    print!("{}", string);
                }
            }

            Self::Debugger(condition) => match (Self::is_minimal(), *condition) {
                (false, _) => {
                    eprint!("{}", ColoredString::from(string).blue());
                }
                // Always remove color if `--minimal`
                (true, Condition::Always) => {
                    eprint_colorless(string);
                }
                (true, Condition::Sometimes) => (),
            },
        }
    }

    pub fn print_registers(&self, registers: &Registers) {
        let ir = registers.ir.as_deref().unwrap_or("----");
        let opcode = registers.opcode.map_or("--", |op| op.mnemonic());
        if Self::is_minimal() {
            self.print_str(&format!("ACC {}\n", registers.accumulator));
            self.print_str(&format!("PC {:02}\n", registers.pc));
            self.print_str(&format!("IR {}\n", ir));
            self.print_str(&format!("OP {}\n", opcode));
            self.print_str(&format!("OPERAND {:02}\n", registers.operand));
            return;
        }

        let rows = [
            ("accumulator", registers.accumulator.clone()),
            ("pc", format!("{:02}", registers.pc)),
            ("ir", ir.to_owned()),
            ("opcode", opcode.to_owned()),
            ("operand", format!("{:02}", registers.operand)),
        ];
        let width = rows.iter().map(|(_, value)| value.len()).max().unwrap_or(0).max(10);

        self.print_str(&format!("\x1b[2m┌{}┐\x1b[0m\n", "─".repeat(width + 16)));
        for (name, value) in rows {
            self.print_str("\x1b[2m│\x1b[0m");
            self.print_str(&format!(" \x1b[1m{:<12}\x1b[0m {:>width$} ", name, value));
            self.print_str(" \x1b[2m│\x1b[0m\n");
        }
        self.print_str(&format!("\x1b[2m└{}┘\x1b[0m\n", "─".repeat(width + 16)));
    }

    /// Ten cells per row, rows labelled with the address of their first cell.
    pub fn print_memory(&self, cells: &[String]) {
        let width = cells.iter().map(String::len).max().unwrap_or(0).max(4);
        if Self::is_minimal() {
            for (address, cell) in cells.iter().enumerate() {
                self.print_str(&format!("{:02} {}\n", address, cell));
            }
            return;
        }

        self.print_str("    ");
        for column in 0..10 {
            self.print_str(&format!(" \x1b[2;3m{:>width$}\x1b[0m", column));
        }
        self.print_str("\n");
        for (row, chunk) in cells.chunks(10).enumerate() {
            self.print_str(&format!("\x1b[1m{:>4}\x1b[0m", row * 10));
            for cell in chunk {
                if cell == Memory::EMPTY_CELL {
                    self.print_str(&format!(" \x1b[2m{:>width$}\x1b[0m", cell));
                } else {
                    self.print_str(&format!(" {:>width$}", cell));
                }
            }
            self.print_str("\n");
        }
    }
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

fn eprint_colorless(string: &str) {
    for ch in Decolored::new(string) {
        eprint!("{}", ch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decolored() {
        assert_eq!(Decolored::new("abcdef").collect::<String>(), "abcdef");
        assert_eq!(
            Decolored::new("abc\x1b[0;2mdef\x1b[0m").collect::<String>(),
            "abcdef"
        );
        assert_eq!(Decolored::new("abc\x1b[0xyz").collect::<String>(), "abc");
        assert_eq!(
            Decolored::new("abc\x1bw[0bxyzmdef").collect::<String>(),
            "abcdef"
        );
    }
}
