use miette::Result;

use crate::error;
use crate::symbol::{Span, SrcOffset};
use crate::word::is_integer;

use self::cursor::{Cursor, RawLine};

pub mod cursor;

/// Whitespace-separated word of an instruction line.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub val: String,
    pub span: Span,
}

impl Token {
    pub fn new(val: impl Into<String>, span: Span) -> Self {
        Token {
            val: val.into(),
            span,
        }
    }
}

/// Operator joining two expression terms.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sign {
    Plus,
    Minus,
}

/// Category of a single source line.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LineKind {
    Blank,
    /// `> text`
    Comment,
    /// `name=literal`
    Variable { name: String, value: String },
    /// `name=a+b-c`
    Expression {
        name: String,
        first: String,
        rest: Vec<(Sign, String)>,
    },
    /// `@name`
    Label { name: String },
    /// `CMD [operand]`
    Instr {
        command: Token,
        operand: Option<Token>,
    },
}

impl LineKind {
    pub fn is_halt(&self) -> bool {
        matches!(self, LineKind::Instr { command, .. } if command.val == "HALT")
    }

    /// Whether compiling this line reads the variable `name`.
    pub fn reads(&self, name: &str) -> bool {
        match self {
            LineKind::Instr {
                operand: Some(operand),
                ..
            } => operand.val == name,
            LineKind::Expression { first, rest, .. } => {
                first == name || rest.iter().any(|(_, term)| term == name)
            }
            _ => false,
        }
    }
}

/// Classified line with its location.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Line {
    pub kind: LineKind,
    /// Trimmed line content.
    pub span: Span,
    /// 1-indexed line number.
    pub number: usize,
}

/// Classify source lines up to and including the first `HALT`.
///
/// `HALT` is terminal, anything after it is never compiled and so is not checked either.
pub fn classify(src: &str) -> Result<Vec<Line>> {
    let mut lines = Vec::new();
    for raw in Cursor::new(src) {
        let line = classify_line(raw, src)?;
        let is_halt = line.kind.is_halt();
        lines.push(line);
        if is_halt {
            break;
        }
    }
    Ok(lines)
}

/// Whether the final physical line is a `HALT` instruction.
///
/// A trailing newline terminates the last line rather than starting an empty one, but blank or
/// comment lines after `HALT` do count.
pub fn ends_with_halt(src: &str) -> bool {
    Cursor::new(src)
        .last()
        .is_some_and(|raw| raw.text.trim() == "HALT")
}

pub fn classify_line(raw: RawLine, src: &str) -> Result<Line> {
    let trimmed = raw.text.trim();
    let leading = raw.text.len() - raw.text.trim_start().len();
    let span = Span::new(SrcOffset(raw.offs + leading), trimmed.len());

    let kind = if trimmed.is_empty() {
        LineKind::Blank
    } else if trimmed.starts_with('>') {
        LineKind::Comment
    } else if let Some(name) = trimmed.strip_prefix('@') {
        if name.is_empty() {
            return Err(error::lex_empty_label(span, src));
        }
        if !name.chars().all(is_id) {
            return Err(error::lex_bad_name(span, src, "label"));
        }
        LineKind::Label {
            name: name.to_owned(),
        }
    } else if trimmed.contains('=') {
        declaration(trimmed, span, src)?
    } else {
        instruction(trimmed, span, src)?
    };

    Ok(Line {
        kind,
        span,
        number: raw.number,
    })
}

/// Test if a character can be part of a variable or label name.
pub(crate) fn is_id(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
}

pub(crate) fn is_variable_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_id)
}

fn declaration(line: &str, span: Span, src: &str) -> Result<LineKind> {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    let Some((name, rhs)) = compact.split_once('=') else {
        unreachable!("caller checked for `=`")
    };

    if !is_variable_name(name) {
        return Err(error::lex_bad_name(span, src, "variable"));
    }
    if rhs.contains('=') {
        return Err(error::lex_malformed(span, src, "more than one `=` in declaration"));
    }
    if rhs.is_empty() {
        return Err(error::lex_malformed(span, src, "missing value after `=`"));
    }

    if is_integer(rhs) {
        return Ok(LineKind::Variable {
            name: name.to_owned(),
            value: rhs.to_owned(),
        });
    }

    let mut first = None;
    let mut rest = Vec::new();
    let mut sign = None;
    let mut start = 0;
    let bounds = rhs
        .char_indices()
        .filter(|(_, ch)| matches!(ch, '+' | '-'))
        .map(|(i, ch)| (i, Some(ch)))
        .chain(std::iter::once((rhs.len(), None)));
    for (end, op) in bounds {
        let term = &rhs[start..end];
        if term.is_empty() {
            return Err(error::lex_malformed(span, src, "expected a variable name"));
        }
        match sign {
            None => first = Some(term.to_owned()),
            Some(sign) => rest.push((sign, term.to_owned())),
        }
        sign = op.map(|ch| if ch == '+' { Sign::Plus } else { Sign::Minus });
        start = end + 1;
    }

    Ok(LineKind::Expression {
        name: name.to_owned(),
        first: first.expect("right-hand side is not empty"),
        rest,
    })
}

fn instruction(line: &str, span: Span, src: &str) -> Result<LineKind> {
    let mut words = line.split_whitespace().map(|word| {
        // `word` is a subslice of `line`
        let offs = word.as_ptr() as usize - line.as_ptr() as usize;
        Token::new(word, Span::new(SrcOffset(span.offs() + offs), word.len()))
    });

    let command = words.next().expect("line is not blank");
    let operand = words.next();
    if let Some(extra) = words.next() {
        return Err(error::lex_extra_operand(extra.span, src));
    }
    Ok(LineKind::Instr { command, operand })
}
