use std::fmt;
use std::str::FromStr;

/// Largest address an instruction operand can hold.
pub const MAX_OPERAND: u8 = 99;

/// Machine operation selected by the first two digits of an instruction word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Opcode {
    /// Read a value from input into memory.
    Read = 10,
    /// Write a value from memory to output.
    Write = 11,
    Load = 20,
    Store = 21,
    Add = 30,
    Subtract = 31,
    /// Unconditional jump.
    Branch = 40,
    /// Jump if accumulator is negative.
    BranchNeg = 41,
    /// Jump if accumulator is zero.
    BranchZero = 42,
    Halt = 43,
}

impl Opcode {
    pub const ALL: [Opcode; 10] = [
        Opcode::Read,
        Opcode::Write,
        Opcode::Load,
        Opcode::Store,
        Opcode::Add,
        Opcode::Subtract,
        Opcode::Branch,
        Opcode::BranchNeg,
        Opcode::BranchZero,
        Opcode::Halt,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.code() == code)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Read => "READ",
            Opcode::Write => "WRITE",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Add => "ADD",
            Opcode::Subtract => "SUBTRACT",
            Opcode::Branch => "BRANCH",
            Opcode::BranchNeg => "BRANCHNEG",
            Opcode::BranchZero => "BRANCHZERO",
            Opcode::Halt => "HALT",
        }
    }

    /// Branch operands are instruction indices rather than variable addresses.
    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::Branch | Opcode::BranchNeg | Opcode::BranchZero)
    }
}

impl FromStr for Opcode {
    type Err = ();

    // Mnemonics are case-sensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.mnemonic() == s)
            .ok_or(())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Decoded 4-digit instruction word.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: u8,
}

/// Reason a memory cell could not be decoded as an instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DecodeError {
    /// Not exactly four decimal digits.
    Malformed,
    UnknownOpcode(u8),
}

impl Instruction {
    pub fn new(opcode: Opcode, operand: u8) -> Self {
        debug_assert!(operand <= MAX_OPERAND, "operand must fit in two digits");
        Instruction { opcode, operand }
    }

    pub fn halt() -> Self {
        Instruction::new(Opcode::Halt, 0)
    }

    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        if raw.len() != 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DecodeError::Malformed);
        }
        // Both halves are two ASCII digits, so parsing cannot fail
        let code: u8 = raw[0..2].parse().map_err(|_| DecodeError::Malformed)?;
        let operand: u8 = raw[2..4].parse().map_err(|_| DecodeError::Malformed)?;
        let opcode = Opcode::from_code(code).ok_or(DecodeError::UnknownOpcode(code))?;
        Ok(Instruction { opcode, operand })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}", self.opcode.code(), self.operand)
    }
}

/// Content of one memory cell in a generated program.
///
/// Memory itself stores raw text, so a literal that happens to look like an instruction is still
/// executable once loaded.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Word {
    Instr(Instruction),
    /// Decimal integer of any length.
    Literal(String),
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Word::Instr(instr) => write!(f, "{instr}"),
            Word::Literal(value) => f.write_str(value),
        }
    }
}

/// Test if a string is a decimal integer with an optional sign.
pub fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_table() {
        let codes: Vec<u8> = Opcode::ALL.iter().map(|op| op.code()).collect();
        assert_eq!(codes, [10, 11, 20, 21, 30, 31, 40, 41, 42, 43]);
        for op in Opcode::ALL {
            assert_eq!(op.mnemonic().parse::<Opcode>(), Ok(op));
            assert_eq!(Opcode::from_code(op.code()), Some(op));
        }
        assert!("load".parse::<Opcode>().is_err());
        assert_eq!(Opcode::from_code(0), None);
    }

    #[test]
    fn instruction_render() {
        assert_eq!(Instruction::new(Opcode::Load, 5).to_string(), "2005");
        assert_eq!(Instruction::new(Opcode::BranchZero, 17).to_string(), "4217");
        assert_eq!(Instruction::halt().to_string(), "4300");
    }

    #[test]
    fn instruction_decode() {
        assert_eq!(
            Instruction::decode("3012"),
            Ok(Instruction::new(Opcode::Add, 12))
        );
        assert_eq!(Instruction::decode("0000"), Err(DecodeError::UnknownOpcode(0)));
        assert_eq!(Instruction::decode("9901"), Err(DecodeError::UnknownOpcode(99)));
        assert_eq!(Instruction::decode("301"), Err(DecodeError::Malformed));
        assert_eq!(Instruction::decode("30123"), Err(DecodeError::Malformed));
        assert_eq!(Instruction::decode("-301"), Err(DecodeError::Malformed));
        assert_eq!(Instruction::decode("30a1"), Err(DecodeError::Malformed));
    }

    #[test]
    fn integers() {
        assert!(is_integer("0"));
        assert!(is_integer("-42"));
        assert!(is_integer("+7"));
        assert!(is_integer("123456789012345678901234567890"));
        assert!(!is_integer(""));
        assert!(!is_integer("-"));
        assert!(!is_integer("1a"));
        assert!(!is_integer("a"));
    }
}
