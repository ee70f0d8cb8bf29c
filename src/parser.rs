use fxhash::FxHashMap;
use miette::Result;

use crate::air::{Air, AirStmt, Operand, Program};
use crate::error;
use crate::lexer::{self, Line, LineKind, Sign, Token};
use crate::symbol::{BranchLabel, BranchTable, Span, Symbol, SymbolTable, Variable};
use crate::word::{Opcode, MAX_OPERAND};

/// Compile source into relocated machine words.
pub fn compile(src: &str) -> Result<Program> {
    Compiler::new(src)?.compile()?.relocate()
}

/// Transforms classified source lines into AIR.
///
/// Owned by a single compilation, nothing is shared between calls.
pub struct Compiler<'a> {
    /// Reference to the source file
    src: &'a str,
    /// Lines up to and including the first `HALT`
    lines: Vec<Line>,
    /// Whether the source already ends with `HALT`
    ends_with_halt: bool,
    symbols: SymbolTable,
    labels: BranchTable,
    /// Expressions dropped as dead stores. Their names stay reserved.
    elided: FxHashMap<String, Variable>,
    air: Vec<AirStmt>,
}

/// Whether generation continues after a line.
enum Flow {
    Continue,
    Halt,
}

impl<'a> Compiler<'a> {
    pub fn new(src: &'a str) -> Result<Self> {
        Ok(Compiler {
            src,
            lines: lexer::classify(src)?,
            ends_with_halt: lexer::ends_with_halt(src),
            symbols: SymbolTable::new(),
            labels: BranchTable::new(),
            elided: FxHashMap::default(),
            air: Vec::new(),
        })
    }

    /// Create AIR out of the classified lines.
    pub fn compile(mut self) -> Result<Air> {
        self.layout()?;

        for idx in 0..self.lines.len() {
            let flow = match self.lines[idx].kind.clone() {
                LineKind::Blank | LineKind::Comment | LineKind::Label { .. } => Flow::Continue,
                LineKind::Variable { name, value } => {
                    self.declare(idx, &name, &value)?;
                    Flow::Continue
                }
                LineKind::Expression { name, first, rest } => {
                    self.expression(idx, &name, &first, &rest)?;
                    Flow::Continue
                }
                LineKind::Instr { command, operand } => {
                    self.instruction(idx, &command, operand.as_ref())?
                }
            };
            if let Flow::Halt = flow {
                break;
            }
        }

        if !self.ends_with_halt {
            let span = self.lines.last().map_or(Span::dummy(), |line| line.span);
            self.air.push(AirStmt::halt(span));
        }

        let mut air = Air::new(self.src, self.symbols);
        for stmt in self.air {
            air.add_stmt(stmt);
        }
        Ok(air)
    }

    /// Record the instruction index of every branch label before generating any code, so that
    /// forward and backward branches resolve the same way.
    fn layout(&mut self) -> Result<()> {
        let mut count = 0;
        for idx in 0..self.lines.len() {
            let line = &self.lines[idx];
            if let LineKind::Label { name } = &line.kind {
                let label = BranchLabel {
                    index: count,
                    span: line.span,
                };
                if let Err(first) = self.labels.insert(name, label) {
                    return Err(error::compile_duplicate_label(
                        line.span, first.span, self.src, name,
                    ));
                }
            }
            count += self.emitted_by(idx);
        }
        Ok(())
    }

    /// Amount of instruction words a line compiles to.
    fn emitted_by(&self, idx: usize) -> usize {
        match &self.lines[idx].kind {
            LineKind::Instr { .. } => 1,
            LineKind::Expression { name, rest, .. } if self.is_read_after(idx, name) => {
                if rest.is_empty() {
                    2
                } else {
                    3 * rest.len()
                }
            }
            _ => 0,
        }
    }

    /// Whether any line after `idx` reads the variable `name`.
    fn is_read_after(&self, idx: usize, name: &str) -> bool {
        self.lines[idx + 1..].iter().any(|line| line.kind.reads(name))
    }

    fn is_declared(&self, name: &str) -> Option<&Variable> {
        self.symbols
            .lookup(name)
            .map(|sym| self.symbols.get(sym))
            .or_else(|| self.elided.get(name))
    }

    /// Fails if `name` was declared before, whether or not that declaration was elided.
    fn check_free(&self, idx: usize, name: &str) -> Result<()> {
        match self.is_declared(name) {
            Some(first) => Err(error::compile_duplicate_variable(
                self.lines[idx].span,
                first,
                self.src,
            )),
            None => Ok(()),
        }
    }

    fn declare(&mut self, idx: usize, name: &str, value: &str) -> Result<Symbol> {
        self.check_free(idx, name)?;
        let line = &self.lines[idx];
        let var = Variable::new(name, value, line.number, line.span);
        Ok(self
            .symbols
            .declare(var)
            .expect("name was checked to be free above"))
    }

    fn lookup(&self, name: &str, span: Span) -> Result<Symbol> {
        self.symbols
            .lookup(name)
            .ok_or_else(|| error::compile_variable_not_found(span, self.src, name))
    }

    /// Lower `name=a+b-c` into `LOAD a; ADD b; STORE name; LOAD name; SUBTRACT c; STORE name`.
    fn expression(
        &mut self,
        idx: usize,
        name: &str,
        first: &str,
        rest: &[(Sign, String)],
    ) -> Result<()> {
        let span = self.lines[idx].span;
        if !self.is_read_after(idx, name) {
            self.check_free(idx, name)?;
            let var = Variable::new(name, "0", self.lines[idx].number, span);
            self.elided.insert(name.to_owned(), var);
            return Ok(());
        }

        // Terms are resolved before the result is declared, so `x=x+a` needs an earlier `x`
        let first = self.lookup(first, span)?;
        let terms = rest
            .iter()
            .map(|(sign, term)| {
                let opcode = match sign {
                    Sign::Plus => Opcode::Add,
                    Sign::Minus => Opcode::Subtract,
                };
                Ok((opcode, self.lookup(term, span)?))
            })
            .collect::<Result<Vec<_>>>()?;
        let result = self.declare(idx, name, "0")?;

        let emit = |opcode, sym| AirStmt::new(opcode, Operand::Variable(sym), span);
        if terms.is_empty() {
            self.air.push(emit(Opcode::Load, first));
            self.air.push(emit(Opcode::Store, result));
            return Ok(());
        }
        let mut acc = first;
        for (opcode, term) in terms {
            self.air.push(emit(Opcode::Load, acc));
            self.air.push(emit(opcode, term));
            self.air.push(emit(Opcode::Store, result));
            acc = result;
        }
        Ok(())
    }

    fn instruction(&mut self, idx: usize, command: &Token, operand: Option<&Token>) -> Result<Flow> {
        let Ok(opcode) = command.val.parse::<Opcode>() else {
            return Err(error::compile_unknown_command(
                command.span,
                self.src,
                &command.val,
            ));
        };
        let span = self.lines[idx].span;

        if opcode == Opcode::Halt {
            if let Some(operand) = operand {
                return Err(error::compile_halt_operand(operand.span, self.src));
            }
            self.air.push(AirStmt::halt(span));
            return Ok(Flow::Halt);
        }

        let Some(operand) = operand else {
            return Err(error::compile_incomplete_command(
                span,
                self.src,
                &command.val,
            ));
        };

        let operand = if opcode.is_branch() {
            self.branch_target(opcode, operand)?
        } else {
            Operand::Variable(self.lookup(&operand.val, operand.span)?)
        };
        self.air.push(AirStmt::new(opcode, operand, span));
        Ok(Flow::Continue)
    }

    fn branch_target(&self, opcode: Opcode, operand: &Token) -> Result<Operand> {
        let Some(name) = operand.val.strip_prefix('@') else {
            return Err(error::compile_expected_label(
                operand.span,
                self.src,
                opcode.mnemonic(),
            ));
        };
        if name.is_empty() {
            return Err(error::lex_empty_label(operand.span, self.src));
        }
        let index = self
            .labels
            .get(name)
            .ok_or_else(|| error::compile_label_not_found(operand.span, self.src, name))?;
        to_operand(index)
            .map(Operand::Branch)
            .ok_or_else(|| error::compile_too_large(operand.span, self.src, index))
    }
}

fn to_operand(address: usize) -> Option<u8> {
    u8::try_from(address).ok().filter(|op| *op <= MAX_OPERAND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::Word;

    fn words(src: &str) -> Vec<String> {
        compile(src).unwrap().to_strings()
    }

    #[test]
    fn add_two_variables() {
        let program = compile("a=5\nb=3\nc=a+b\nWRITE c\nHALT").unwrap();
        assert_eq!(
            program.to_strings(),
            ["2005", "3006", "2107", "1107", "4300", "5", "3", "0"]
        );
        assert_eq!(program.slot("c"), Some(7));
    }

    #[test]
    fn load_add_store() {
        let program = compile("x=10\ny=20\nLOAD x\nADD y\nSTORE x\nWRITE x\nHALT").unwrap();
        assert_eq!(program.instruction_count(), 5);
        assert_eq!(
            program.to_strings(),
            ["2005", "3006", "2105", "1105", "4300", "10", "20"]
        );
    }

    #[test]
    fn implicit_halt() {
        assert_eq!(words("x=1\nWRITE x"), ["1102", "4300", "1"]);
        assert_eq!(words("x=1\nWRITE x\nHALT\n"), ["1102", "4300", "1"]);
        // Only the final physical line decides, so a trailing comment gets a HALT of its own
        assert_eq!(
            words("x=1\nWRITE x\nHALT\n> end"),
            ["1103", "4300", "4300", "1"]
        );
        assert_eq!(words(""), ["4300"]);
    }

    #[test]
    fn halt_truncates() {
        // The last line is not HALT, so one more HALT is appended after truncation
        assert_eq!(words("x=1\nWRITE x\nHALT\nWRITE y"), ["1103", "4300", "4300", "1"]);
    }

    #[test]
    fn exactly_one_halt_appended() {
        let program = compile("a=1\nb=2\nLOAD a\nADD b\nSTORE a").unwrap();
        let halts = program
            .words()
            .iter()
            .filter(|word| word.to_string() == "4300")
            .count();
        assert_eq!(halts, 1);
        assert_eq!(program.words()[program.instruction_count() - 1].to_string(), "4300");
    }

    #[test]
    fn unused_variable_elided() {
        let program = compile("v1=4\nv2=9\nWRITE v1\nHALT").unwrap();
        let n = program.instruction_count();
        assert_eq!(n, 2);
        assert_eq!(program.slot("v1"), Some(n as u8));
        assert_eq!(program.slot("v2"), None);
        assert_eq!(program.len(), n + 1);
    }

    #[test]
    fn dead_expression_elided() {
        let program = compile("a=1\nb=2\nc=a+b\nWRITE a\nHALT").unwrap();
        assert_eq!(program.to_strings(), ["1102", "4300", "1"]);
        assert_eq!(program.slot("c"), None);
    }

    #[test]
    fn expression_read_after_halt_is_dead() {
        let program = compile("a=1\nc=a+a\nHALT\nWRITE c").unwrap();
        assert_eq!(program.to_strings(), ["4300", "4300"]);
    }

    #[test]
    fn expression_chain() {
        assert_eq!(
            words("a=1\nb=2\nd=3\nc=a+b-d\nWRITE c"),
            ["2008", "3009", "2110", "2010", "3111", "2110", "1110", "4300", "1", "2", "0", "3"]
        );
    }

    #[test]
    fn single_term_expression() {
        assert_eq!(words("a=4\nb=a\nWRITE b"), ["2004", "2105", "1105", "4300", "4", "0"]);
    }

    #[test]
    fn expression_needs_declared_terms() {
        assert!(compile("a=1\nc=a+b\nWRITE c").is_err());
        assert!(compile("c=c+c\nWRITE c").is_err());
    }

    #[test]
    fn duplicate_variable() {
        let err = compile("x=1\nx=2\nHALT").unwrap_err();
        assert!(err.to_string().contains("already exists"));
        let help = err.help().map(|help| help.to_string());
        assert_eq!(help.as_deref(), Some("'x' was first declared on line 1"));
        // Names of elided expressions stay reserved
        assert!(compile("a=1\nc=a+a\nc=5\nHALT").is_err());
        assert!(compile("a=1\nc=5\nc=a+a\nHALT").is_err());
    }

    #[test]
    fn duplicate_label() {
        let err = compile("@top\nx=1\nWRITE x\n@top\nHALT").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn unknown_and_incomplete_commands() {
        let err = compile("x=1\nPRINT x").unwrap_err();
        assert!(err.to_string().contains("Unknown command"));
        let err = compile("x=1\nWRITE").unwrap_err();
        assert!(err.to_string().contains("Incomplete command"));
        assert!(compile("HALT x").is_err());
    }

    #[test]
    fn missing_variable() {
        let err = compile("WRITE x").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn backward_branch() {
        assert_eq!(
            words("x=1\n@top\nWRITE x\nBRANCH @top"),
            ["1103", "4000", "4300", "1"]
        );
    }

    #[test]
    fn forward_branch() {
        assert_eq!(
            words("x=0\nLOAD x\nBRANCHZERO @end\nWRITE x\n@end\nHALT"),
            ["2004", "4203", "1104", "4300", "0"]
        );
    }

    #[test]
    fn forward_and_backward_agree() {
        let forward = compile("x=1\nBRANCH @mid\nWRITE x\n@mid\nWRITE x\nHALT").unwrap();
        let backward = compile("x=1\nWRITE x\nWRITE x\n@mid\nWRITE x\nBRANCH @mid\nHALT").unwrap();
        assert_eq!(forward.to_strings()[0], "4002");
        assert_eq!(backward.to_strings()[3], "4002");
    }

    #[test]
    fn forward_branch_over_declarations() {
        // Declarations and comments between the branch and its label emit nothing
        assert_eq!(
            words("x=1\nBRANCH @end\n> skip\ny=2\nz=x+y\nWRITE z\n@end\nHALT"),
            ["4005", "2006", "3007", "2108", "1108", "4300", "1", "2", "0"]
        );
    }

    #[test]
    fn branch_errors() {
        assert!(compile("BRANCH @nowhere").is_err());
        assert!(compile("BRANCH @").is_err());
        assert!(compile("x=1\nBRANCH x").is_err());
        // Labels after HALT are never reached
        assert!(compile("BRANCH @end\nHALT\n@end").is_err());
    }

    #[test]
    fn numeric_operands_are_not_addresses() {
        let err = compile("WRITE 7\nHALT").unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(compile("x=1\nLOAD 00\nHALT").is_err());
    }

    #[test]
    fn names_starting_with_digits() {
        assert_eq!(words("1x=2\nWRITE 1x\nHALT"), ["1102", "4300", "2"]);
    }

    #[test]
    fn large_literals_are_kept_verbatim() {
        let program = compile("big=123456789012345678901234567890\nWRITE big").unwrap();
        assert_eq!(
            program.data(),
            [Word::Literal("123456789012345678901234567890".into())]
        );
    }

    #[test]
    fn errors_carry_no_partial_output() {
        // Error on the last line still fails the whole compile
        assert!(compile("x=1\nWRITE x\nWRITE x\nSTORE nope").is_err());
    }
}
