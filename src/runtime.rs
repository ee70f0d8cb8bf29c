use std::cmp::Ordering;
use std::{error, fmt, io};

use num_bigint::BigInt;

use crate::device::Device;
use crate::memory::Memory;
use crate::word::{is_integer, DecodeError, Instruction, Opcode};

/// Registers of the processor. All of them are reset before a program is loaded.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Registers {
    /// Address of the next instruction to fetch
    pub pc: usize,
    /// Raw word fetched by the last cycle
    pub ir: Option<String>,
    pub opcode: Option<Opcode>,
    pub operand: u8,
    /// Decimal integer of any length
    pub accumulator: String,
}

impl Default for Registers {
    fn default() -> Self {
        Registers {
            pc: 0,
            ir: None,
            opcode: None,
            operand: 0,
            accumulator: "0".to_owned(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Status {
    Running,
    Halted,
}

/// Read-only copy of processor state.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Snapshot {
    pub registers: Registers,
    pub memory: Vec<String>,
}

/// Fatal condition raised during a cycle. The processor halts after any of these.
#[derive(Debug)]
pub enum RuntimeError {
    /// Fetched word is not exactly four digits.
    MalformedWord { address: usize, word: String },
    UnknownOpcode { address: usize, word: String },
    /// Memory operand does not hold an integer.
    InvalidValue { address: usize, value: String },
    InvalidInput { address: usize, input: String },
    MissingInput { address: usize },
    AddressOutOfRange { address: usize },
    ProgramTooLarge { words: usize, capacity: usize },
    Io(io::Error),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::MalformedWord { address, word } => {
                write!(f, "malformed word '{word}' at address {address:02}")
            }
            RuntimeError::UnknownOpcode { address, word } => {
                write!(f, "unknown opcode in word '{word}' at address {address:02}")
            }
            RuntimeError::InvalidValue { address, value } => {
                write!(f, "value '{value}' at address {address:02} is not an integer")
            }
            RuntimeError::InvalidInput { address, input } => {
                write!(f, "input '{input}' for address {address:02} is not an integer")
            }
            RuntimeError::MissingInput { address } => {
                write!(f, "input ended while reading into address {address:02}")
            }
            RuntimeError::AddressOutOfRange { address } => {
                write!(f, "address {address} is out of range")
            }
            RuntimeError::ProgramTooLarge { words, capacity } => {
                write!(f, "program of {words} words does not fit in {capacity} cells")
            }
            RuntimeError::Io(err) => write!(f, "device error: {err}"),
        }
    }
}

impl error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            RuntimeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(err: io::Error) -> Self {
        RuntimeError::Io(err)
    }
}

/// Where the next fetch comes from after an instruction was executed.
enum Flow {
    Next,
    Jump(usize),
    Halt,
}

type Handler<D> = fn(&mut Processor<D>, usize) -> Result<Flow, RuntimeError>;

/// Fetch-decode-execute machine over a [`Memory`], talking to a [`Device`].
pub struct Processor<D: Device> {
    memory: Memory,
    registers: Registers,
    status: Status,
    device: D,
}

impl<D: Device> Processor<D> {
    pub fn new(device: D) -> Self {
        Self::with_memory_size(Memory::DEFAULT_SIZE, device)
    }

    pub fn with_memory_size(size: usize, device: D) -> Self {
        Processor {
            memory: Memory::new(size),
            registers: Registers::default(),
            status: Status::Running,
            device,
        }
    }

    /// Reset the machine and write `words` from address 0 upward.
    pub fn load<I, S>(&mut self, words: I) -> Result<(), RuntimeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reset();
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        if words.len() > self.memory.len() {
            return Err(RuntimeError::ProgramTooLarge {
                words: words.len(),
                capacity: self.memory.len(),
            });
        }
        for (address, word) in words.into_iter().enumerate() {
            self.memory.set(address, word);
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.memory.reset();
        self.registers = Registers::default();
        self.status = Status::Running;
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn dump(&self) -> Snapshot {
        Snapshot {
            registers: self.registers.clone(),
            memory: self.memory.cells().to_vec(),
        }
    }

    /// Run until the program halts or an error occurs.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while self.step()? == Status::Running {}
        Ok(())
    }

    /// Execute exactly one cycle. Stepping a halted processor does nothing.
    pub fn step(&mut self) -> Result<Status, RuntimeError> {
        if self.status == Status::Halted {
            return Ok(Status::Halted);
        }
        let result = self.cycle();
        if result.is_err() {
            self.status = Status::Halted;
        }
        result.map(|_| self.status)
    }

    fn cycle(&mut self) -> Result<(), RuntimeError> {
        let address = self.registers.pc;
        // Running off the end of memory is an implicit halt
        let Some(word) = self.memory.get(address) else {
            self.status = Status::Halted;
            return Ok(());
        };
        let word = word.to_owned();
        self.registers.ir = Some(word.clone());
        let instr = Instruction::decode(&word).map_err(|err| match err {
            DecodeError::Malformed => RuntimeError::MalformedWord {
                address,
                word: word.clone(),
            },
            DecodeError::UnknownOpcode(_) => RuntimeError::UnknownOpcode {
                address,
                word: word.clone(),
            },
        })?;

        self.registers.opcode = Some(instr.opcode);
        self.registers.operand = instr.operand;

        let operand = instr.operand as usize;
        match Self::handler(instr.opcode)(self, operand)? {
            Flow::Next => self.registers.pc += 1,
            Flow::Jump(target) => self.registers.pc = target,
            Flow::Halt => self.status = Status::Halted,
        }
        if !self.memory.is_address_valid(self.registers.pc) {
            self.status = Status::Halted;
        }
        Ok(())
    }

    fn handler(opcode: Opcode) -> Handler<D> {
        match opcode {
            Opcode::Read => Self::read,
            Opcode::Write => Self::write,
            Opcode::Load => Self::load_acc,
            Opcode::Store => Self::store,
            Opcode::Add => Self::add,
            Opcode::Subtract => Self::subtract,
            Opcode::Branch => Self::branch,
            Opcode::BranchNeg => Self::branch_neg,
            Opcode::BranchZero => Self::branch_zero,
            Opcode::Halt => Self::halt,
        }
    }

    fn cell(&self, address: usize) -> Result<&str, RuntimeError> {
        self.memory
            .get(address)
            .ok_or(RuntimeError::AddressOutOfRange { address })
    }

    fn value(&self, address: usize) -> Result<BigInt, RuntimeError> {
        parse_value(address, self.cell(address)?)
    }

    fn read(&mut self, address: usize) -> Result<Flow, RuntimeError> {
        if !self.memory.is_address_valid(address) {
            return Err(RuntimeError::AddressOutOfRange { address });
        }
        let input = self
            .device
            .read(address as u8)?
            .ok_or(RuntimeError::MissingInput { address })?;
        let input = input.trim();
        if !is_integer(input) {
            return Err(RuntimeError::InvalidInput {
                address,
                input: input.to_owned(),
            });
        }
        self.memory.set(address, input);
        Ok(Flow::Next)
    }

    fn write(&mut self, address: usize) -> Result<Flow, RuntimeError> {
        let value = self.cell(address)?.to_owned();
        self.device.write(address as u8, &value)?;
        Ok(Flow::Next)
    }

    fn load_acc(&mut self, address: usize) -> Result<Flow, RuntimeError> {
        let value = self.cell(address)?;
        if !is_integer(value) {
            return Err(RuntimeError::InvalidValue {
                address,
                value: value.to_owned(),
            });
        }
        self.registers.accumulator = value.to_owned();
        Ok(Flow::Next)
    }

    fn store(&mut self, address: usize) -> Result<Flow, RuntimeError> {
        if !self.memory.set(address, self.registers.accumulator.clone()) {
            return Err(RuntimeError::AddressOutOfRange { address });
        }
        Ok(Flow::Next)
    }

    fn arithmetic(
        &mut self,
        address: usize,
        op: fn(BigInt, BigInt) -> BigInt,
    ) -> Result<Flow, RuntimeError> {
        let acc = parse_value(self.registers.pc, &self.registers.accumulator)?;
        let value = self.value(address)?;
        self.registers.accumulator = op(acc, value).to_string();
        Ok(Flow::Next)
    }

    fn add(&mut self, address: usize) -> Result<Flow, RuntimeError> {
        self.arithmetic(address, |acc, value| acc + value)
    }

    fn subtract(&mut self, address: usize) -> Result<Flow, RuntimeError> {
        self.arithmetic(address, |acc, value| acc - value)
    }

    fn branch(&mut self, address: usize) -> Result<Flow, RuntimeError> {
        Ok(Flow::Jump(address))
    }

    fn branch_neg(&mut self, address: usize) -> Result<Flow, RuntimeError> {
        Ok(match sign(&self.registers.accumulator) {
            Ordering::Less => Flow::Jump(address),
            _ => Flow::Next,
        })
    }

    fn branch_zero(&mut self, address: usize) -> Result<Flow, RuntimeError> {
        Ok(match sign(&self.registers.accumulator) {
            Ordering::Equal => Flow::Jump(address),
            _ => Flow::Next,
        })
    }

    fn halt(&mut self, _address: usize) -> Result<Flow, RuntimeError> {
        Ok(Flow::Halt)
    }
}

fn parse_value(address: usize, raw: &str) -> Result<BigInt, RuntimeError> {
    let invalid = || RuntimeError::InvalidValue {
        address,
        value: raw.to_owned(),
    };
    if !is_integer(raw) {
        return Err(invalid());
    }
    raw.parse().map_err(|_| invalid())
}

/// Sign of a decimal integer of any length, without parsing it.
fn sign(value: &str) -> Ordering {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    if digits.bytes().all(|b| b == b'0') {
        Ordering::Equal
    } else if negative {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Buffered;

    fn run(words: &[&str], input: &[&str]) -> (Processor<Buffered>, Result<(), RuntimeError>) {
        let mut cpu = Processor::new(Buffered::with_input(input.iter().copied()));
        cpu.load(words.iter().copied()).unwrap();
        let result = cpu.run();
        (cpu, result)
    }

    #[test]
    fn add_and_write() {
        // LOAD 05, ADD 06, STORE 07, WRITE 07, HALT
        let (cpu, result) = run(&["2005", "3006", "2107", "1107", "4300", "5", "3", "0"], &[]);
        result.unwrap();
        assert_eq!(cpu.device().output(), ["8"]);
        assert_eq!(cpu.status(), Status::Halted);
    }

    #[test]
    fn read_then_subtract() {
        let (cpu, result) = run(&["1007", "2007", "3106", "2107", "1107", "4300", "12", "0"], &["40"]);
        result.unwrap();
        assert_eq!(cpu.device().output(), ["28"]);
    }

    #[test]
    fn large_values() {
        let (cpu, result) = run(
            &["2005", "3006", "2107", "1107", "4300", "123456789012345678901234567", "1", "0"],
            &[],
        );
        result.unwrap();
        assert_eq!(cpu.device().output(), ["123456789012345678901234568"]);
    }

    #[test]
    fn arithmetic_is_unbounded() {
        // Both values are wider than any machine integer
        let (cpu, result) = run(
            &["2004", "3005", "1100", "4300", "1234567890123456789012345678901234567890", "1"],
            &[],
        );
        result.unwrap();
        assert_eq!(cpu.registers().accumulator, "1234567890123456789012345678901234567891");

        let (cpu, result) = run(
            &["2004", "3105", "4300", "0", "0", "+99999999999999999999999999999999999999999"],
            &[],
        );
        result.unwrap();
        assert_eq!(cpu.registers().accumulator, "-99999999999999999999999999999999999999999");
    }

    #[test]
    fn non_integer_operand() {
        let (cpu, result) = run(&["2002", "4300", "abc"], &[]);
        assert!(matches!(result, Err(RuntimeError::InvalidValue { address: 2, .. })));
        assert_eq!(cpu.status(), Status::Halted);
    }

    #[test]
    fn branch_neg_only_when_negative() {
        // LOAD value, BRANCHNEG 04, WRITE one, HALT, WRITE two, HALT
        for (value, expected) in [("-1", "2"), ("0", "1"), ("7", "1")] {
            let (cpu, result) = run(&["2006", "4104", "1107", "4300", "1108", "4300", value, "1", "2"], &[]);
            result.unwrap();
            assert_eq!(cpu.device().output(), [expected], "accumulator {value}");
        }
    }

    #[test]
    fn branch_zero_only_when_zero() {
        for (value, expected) in [("-1", "1"), ("0", "2"), ("-0", "2"), ("7", "1")] {
            let (cpu, result) = run(&["2006", "4204", "1107", "4300", "1108", "4300", value, "1", "2"], &[]);
            result.unwrap();
            assert_eq!(cpu.device().output(), [expected], "accumulator {value}");
        }
    }

    #[test]
    fn unconditional_branch() {
        // BRANCH 02, WRITE 05, WRITE 06, HALT
        let (cpu, result) = run(&["4002", "1105", "1106", "4300", "0", "1", "2"], &[]);
        result.unwrap();
        assert_eq!(cpu.device().output(), ["2"]);
    }

    #[test]
    fn malformed_word() {
        let (cpu, result) = run(&["1103", "20x1", "4300", "9"], &[]);
        match result {
            Err(RuntimeError::MalformedWord { address, word }) => {
                assert_eq!(address, 1);
                assert_eq!(word, "20x1");
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(cpu.device().output(), ["9"]);
        assert_eq!(cpu.status(), Status::Halted);
    }

    #[test]
    fn bad_word_is_still_fetched() {
        let mut cpu = Processor::new(Buffered::new());
        cpu.load(["2002", "abcd", "5"]).unwrap();
        cpu.step().unwrap();
        assert!(matches!(
            cpu.step(),
            Err(RuntimeError::MalformedWord { address: 1, .. })
        ));
        assert_eq!(cpu.dump().registers.ir.as_deref(), Some("abcd"));
    }

    #[test]
    fn unknown_opcode() {
        let (_, result) = run(&["9900"], &[]);
        assert!(matches!(
            result,
            Err(RuntimeError::UnknownOpcode { address: 0, .. })
        ));
        // Empty memory decodes to opcode 00
        let (_, result) = run(&[], &[]);
        assert!(matches!(result, Err(RuntimeError::UnknownOpcode { .. })));
    }

    #[test]
    fn bad_input() {
        let (_, result) = run(&["1002", "4300"], &["ten"]);
        assert!(matches!(result, Err(RuntimeError::InvalidInput { address: 2, .. })));
        let (_, result) = run(&["1002", "4300"], &[]);
        assert!(matches!(result, Err(RuntimeError::MissingInput { address: 2 })));
    }

    #[test]
    fn step_executes_one_cycle() {
        let mut cpu = Processor::new(Buffered::new());
        cpu.load(["2003", "1103", "4300", "42"]).unwrap();

        assert_eq!(cpu.step().unwrap(), Status::Running);
        let snapshot = cpu.dump();
        assert_eq!(snapshot.registers.pc, 1);
        assert_eq!(snapshot.registers.accumulator, "42");
        assert_eq!(snapshot.registers.ir.as_deref(), Some("2003"));
        assert_eq!(snapshot.registers.opcode, Some(Opcode::Load));
        assert_eq!(snapshot.memory[3], "42");
        assert!(cpu.device().output().is_empty());

        assert_eq!(cpu.step().unwrap(), Status::Running);
        assert_eq!(cpu.device().output(), ["42"]);
        assert_eq!(cpu.step().unwrap(), Status::Halted);
        assert_eq!(cpu.step().unwrap(), Status::Halted);
    }

    #[test]
    fn runs_off_end_of_memory() {
        let mut cpu = Processor::with_memory_size(2, Buffered::new());
        cpu.load(["1101", "7"]).unwrap();
        assert_eq!(cpu.step().unwrap(), Status::Running);
        // Address 1 holds data, which is not an instruction
        assert!(cpu.step().is_err());

        let mut cpu = Processor::with_memory_size(1, Buffered::new());
        cpu.load(["1100"]).unwrap();
        assert_eq!(cpu.step().unwrap(), Status::Halted);
        assert_eq!(cpu.device().output(), ["1100"]);
    }

    #[test]
    fn operand_outside_memory() {
        let mut cpu = Processor::with_memory_size(10, Buffered::new());
        cpu.load(["1150"]).unwrap();
        assert!(matches!(
            cpu.run(),
            Err(RuntimeError::AddressOutOfRange { address: 50 })
        ));
    }

    #[test]
    fn load_checks_capacity() {
        let mut cpu = Processor::with_memory_size(2, Buffered::new());
        assert!(matches!(
            cpu.load(["4300", "1", "2"]),
            Err(RuntimeError::ProgramTooLarge { words: 3, capacity: 2 })
        ));
    }

    #[test]
    fn reset_clears_state() {
        let (mut cpu, result) = run(&["2002", "4300", "5"], &[]);
        result.unwrap();
        assert_eq!(cpu.registers().accumulator, "5");
        cpu.reset();
        assert_eq!(cpu.status(), Status::Running);
        assert_eq!(cpu.registers(), &Registers::default());
        assert_eq!(cpu.memory(), &Memory::default());
    }

    #[test]
    fn sign_of_text() {
        assert_eq!(sign("-0003"), Ordering::Less);
        assert_eq!(sign("-000"), Ordering::Equal);
        assert_eq!(sign("+4"), Ordering::Greater);
        assert_eq!(sign("0"), Ordering::Equal);
    }
}
