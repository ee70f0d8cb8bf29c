use miette::Result;

use crate::error;
use crate::symbol::{Span, SrcOffset};
use crate::word::is_integer;

/// Read a compiled program: one word per line, starting at address 0.
///
/// Blank lines are skipped. Words are only checked to be integers here; whether a word is a valid
/// instruction is decided when the processor fetches it.
pub fn parse_words(src: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut offs = 0;
    for line in src.split_inclusive('\n') {
        let start = offs;
        offs += line.len();

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !is_integer(trimmed) {
            let lead = line.len() - line.trim_start().len();
            let span = Span::new(SrcOffset(start + lead), trimmed.len());
            return Err(error::load_bad_word(span, src));
        }
        words.push(trimmed.to_owned());
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_words() {
        let words = parse_words("2005\r\n  3006\n\n-12\n4300").unwrap();
        assert_eq!(words, ["2005", "3006", "-12", "4300"]);
        assert!(parse_words("").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_integers() {
        let err = parse_words("2005\nLOAD x\n").unwrap_err();
        assert_eq!(err.code().map(|code| code.to_string()), Some("load::bad_word".into()));
        let label = err.labels().and_then(|mut labels| labels.next()).unwrap();
        assert_eq!(label.offset(), 5);
        assert_eq!(label.len(), 6);
    }
}
