use std::fmt;

use miette::Result;

use crate::error;
use crate::symbol::{Span, Symbol, SymbolTable};
use crate::word::{Instruction, Opcode, Word, MAX_OPERAND};

/// Intermediate representation of a compiled program, before variables are given addresses.
pub struct Air {
    /// Source, for diagnostics raised during relocation
    src: String,
    stmts: Vec<AirStmt>,
    symbols: SymbolTable,
}

/// Single generated instruction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AirStmt {
    pub opcode: Opcode,
    pub operand: Operand,
    /// Source line that produced the instruction.
    pub span: Span,
}

/// Operand record of a generated instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operand {
    /// `HALT` carries no operand.
    None,
    /// Absolute instruction index, never relocated.
    Branch(u8),
    /// Pending reference, rewritten to the variable's slot during relocation.
    Variable(Symbol),
}

impl AirStmt {
    pub fn new(opcode: Opcode, operand: Operand, span: Span) -> Self {
        AirStmt {
            opcode,
            operand,
            span,
        }
    }

    pub fn halt(span: Span) -> Self {
        AirStmt::new(Opcode::Halt, Operand::None, span)
    }
}

impl Air {
    pub fn new(src: &str, symbols: SymbolTable) -> Self {
        Air {
            src: src.to_owned(),
            stmts: Vec::new(),
            symbols,
        }
    }

    pub fn add_stmt(&mut self, stmt: AirStmt) {
        self.stmts.push(stmt)
    }

    /// Give every variable read by an instruction a memory slot after the last instruction, in
    /// order of first use, then render the program.
    ///
    /// Variables that no instruction refers to are left out of the program entirely.
    pub fn relocate(mut self) -> Result<Program> {
        let instructions = self.stmts.len();
        let limit = MAX_OPERAND as usize + 1;
        if let Some(stmt) = self.stmts.get(limit) {
            return Err(error::compile_too_large(stmt.span, &self.src, limit));
        }

        let mut data = Vec::new();
        let mut slots = Vec::new();
        let mut words = Vec::with_capacity(instructions);

        for stmt in &self.stmts {
            let operand = match stmt.operand {
                Operand::None => 0,
                Operand::Branch(idx) => idx,
                Operand::Variable(sym) => {
                    let var = self.symbols.get_mut(sym);
                    match var.slot {
                        Some(slot) => slot,
                        None => {
                            let address = instructions + data.len();
                            let slot = u8::try_from(address)
                                .ok()
                                .filter(|slot| *slot <= MAX_OPERAND)
                                .ok_or_else(|| {
                                    error::compile_too_large(stmt.span, &self.src, address)
                                })?;
                            var.slot = Some(slot);
                            data.push(Word::Literal(var.value.clone()));
                            slots.push((var.name.clone(), slot));
                            slot
                        }
                    }
                }
            };
            words.push(Word::Instr(Instruction::new(stmt.opcode, operand)));
        }
        words.extend(data);

        Ok(Program {
            words,
            instructions,
            slots,
        })
    }
}

/// Relocated program: instruction words followed by the values of referenced variables.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Program {
    words: Vec<Word>,
    instructions: usize,
    /// Variable name -> address, in order of assignment
    slots: Vec<(String, u8)>,
}

impl Program {
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Amount of instruction words, which is also the address of the first variable.
    pub fn instruction_count(&self) -> usize {
        self.instructions
    }

    pub fn data(&self) -> &[Word] {
        &self.words[self.instructions..]
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Address assigned to a variable, if any instruction reads it.
    pub fn slot(&self, name: &str) -> Option<u8> {
        self.slots
            .iter()
            .find(|(var, _)| var == name)
            .map(|(_, slot)| *slot)
    }

    /// Words as they are stored in memory.
    pub fn to_strings(&self) -> Vec<String> {
        self.words.iter().map(Word::to_string).collect()
    }
}

/// Newline-delimited words, the `.sml` format.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for word in &self.words {
            writeln!(f, "{word}")?;
        }
        Ok(())
    }
}
