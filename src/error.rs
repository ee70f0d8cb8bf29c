use miette::{miette, LabeledSpan, Report, Severity};

use crate::symbol::{Span, Variable};

// Lexer errors

pub fn lex_malformed(span: Span, src: &str, reason: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::malformed",
        help = "declarations look like `name=10` or `name=a+b-c`",
        labels = vec![LabeledSpan::at(span, reason)],
        "Malformed declaration",
    )
    .with_source_code(src.to_owned())
}

pub fn lex_bad_name(span: Span, src: &str, kind: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::bad_name",
        help = "names may contain letters, digits and `_`, variables cannot start with a digit",
        labels = vec![LabeledSpan::at(span, format!("invalid {kind} name"))],
        "Encountered an invalid {kind} name",
    )
    .with_source_code(src.to_owned())
}

pub fn lex_empty_label(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::empty_label",
        help = "give the label a name, like `@loop`",
        labels = vec![LabeledSpan::at(span, "empty label")],
        "Branch label has no name",
    )
    .with_source_code(src.to_owned())
}

pub fn lex_extra_operand(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::extra_operand",
        help = "instructions take at most one operand",
        labels = vec![LabeledSpan::at(span, "unexpected operand")],
        "Too many operands",
    )
    .with_source_code(src.to_owned())
}

// Compiler errors

pub fn compile_duplicate_variable(span: Span, first: &Variable, src: &str) -> Report {
    let name = &first.name;
    miette!(
        severity = Severity::Error,
        code = "compile::duplicate_variable",
        help = format!("'{name}' was first declared on line {}", first.line),
        labels = vec![
            LabeledSpan::at(span, "declared again here"),
            LabeledSpan::at(first.span, "first declared here"),
        ],
        "Variable '{name}' already exists",
    )
    .with_source_code(src.to_owned())
}

pub fn compile_duplicate_label(span: Span, first: Span, src: &str, name: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "compile::duplicate_label",
        help = "branch labels can only be declared once per file",
        labels = vec![
            LabeledSpan::at(span, "declared again here"),
            LabeledSpan::at(first, "first declared here"),
        ],
        "Branch label '@{name}' already exists",
    )
    .with_source_code(src.to_owned())
}

pub fn compile_unknown_command(span: Span, src: &str, command: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "compile::unknown_command",
        help = "available commands are READ, WRITE, LOAD, STORE, ADD, SUBTRACT, BRANCH, BRANCHNEG, BRANCHZERO and HALT",
        labels = vec![LabeledSpan::at(span, "unknown command")],
        "Unknown command '{command}'",
    )
    .with_source_code(src.to_owned())
}

pub fn compile_incomplete_command(span: Span, src: &str, command: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "compile::incomplete_command",
        help = format!("{command} expects a variable name or `@label` to follow"),
        labels = vec![LabeledSpan::at(span, "missing operand")],
        "Incomplete command '{command}'",
    )
    .with_source_code(src.to_owned())
}

pub fn compile_halt_operand(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "compile::halt_operand",
        help = "HALT takes no operand",
        labels = vec![LabeledSpan::at(span, "unexpected operand")],
        "Unexpected operand for HALT",
    )
    .with_source_code(src.to_owned())
}

pub fn compile_variable_not_found(span: Span, src: &str, name: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "compile::variable_not_found",
        help = format!("variables must be declared before they are used, like `{name}=0`"),
        labels = vec![LabeledSpan::at(span, "undeclared variable")],
        "Variable '{name}' not found",
    )
    .with_source_code(src.to_owned())
}

pub fn compile_expected_label(span: Span, src: &str, command: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "compile::expected_label",
        help = format!("{command} jumps to a branch label, like `{command} @loop`"),
        labels = vec![LabeledSpan::at(span, "not a branch label")],
        "Expected a branch label",
    )
    .with_source_code(src.to_owned())
}

pub fn compile_label_not_found(span: Span, src: &str, name: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "compile::label_not_found",
        help = format!("declare the label on its own line as `@{name}` before HALT"),
        labels = vec![LabeledSpan::at(span, "unknown label")],
        "Branch label '@{name}' doesn't exist",
    )
    .with_source_code(src.to_owned())
}

pub fn compile_too_large(span: Span, src: &str, address: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "compile::too_large",
        help = "operands are two digits wide, so programs can only use addresses 00 to 99",
        labels = vec![LabeledSpan::at(span, format!("needs address {address}"))],
        "Program too large",
    )
    .with_source_code(src.to_owned())
}

// Loader errors

pub fn load_bad_word(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::bad_word",
        help = "every line of a compiled program must be a decimal integer",
        labels = vec![LabeledSpan::at(span, "not a word")],
        "Encountered an invalid memory word",
    )
    .with_source_code(src.to_owned())
}
