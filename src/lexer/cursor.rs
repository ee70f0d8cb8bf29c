//! Line-oriented cursor over a source string.
// Structure follows the `rustc_lexer` cursor, but the unit of iteration is a whole line since the
// language has no tokens that span lines.

/// Raw line of source with its position.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RawLine<'a> {
    /// Line content without the terminator.
    pub text: &'a str,
    /// Byte offset of `text` from the start of the source.
    pub offs: usize,
    /// 1-indexed line number.
    pub number: usize,
}

/// Iterator over the lines of a source.
pub struct Cursor<'a> {
    len_remaining: usize,
    /// Index that the cursor is pointing to in the source
    curr_pt: usize,
    /// Amount of lines consumed so far
    line: usize,
    chars: &'a str,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Cursor<'a> {
        Cursor {
            len_remaining: input.len(),
            curr_pt: 0,
            line: 0,
            chars: input,
        }
    }

    /// File is finished parsing
    pub fn is_eof(&self) -> bool {
        self.len_remaining == 0
    }

    /// Return slice of input starting at the current point of the cursor
    pub fn at_curr_pt(&self) -> &'a str {
        &self.chars[self.curr_pt..]
    }

    /// Move cursor ahead in the input by given amount
    pub fn advance(&mut self, amt: usize) {
        self.curr_pt += amt;
        self.len_remaining -= amt;
    }

    /// Consume the next line, including its terminator.
    pub fn next_line(&mut self) -> Option<RawLine<'a>> {
        if self.is_eof() {
            return None;
        }
        let rest = self.at_curr_pt();
        let (len, terminator) = match rest.find('\n') {
            Some(idx) => (idx, 1),
            None => (rest.len(), 0),
        };
        // CRLF line endings
        let text = rest[..len].strip_suffix('\r').unwrap_or(&rest[..len]);
        let offs = self.curr_pt;

        self.advance(len + terminator);
        self.line += 1;
        Some(RawLine {
            text,
            offs,
            number: self.line,
        })
    }
}

impl<'a> Iterator for Cursor<'a> {
    type Item = RawLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_lines_with_offsets() {
        let lines: Vec<_> = Cursor::new("a=1\r\n\nWRITE a\n").collect();
        assert_eq!(
            lines,
            vec![
                RawLine { text: "a=1", offs: 0, number: 1 },
                RawLine { text: "", offs: 5, number: 2 },
                RawLine { text: "WRITE a", offs: 6, number: 3 },
            ]
        );
    }

    #[test]
    fn no_trailing_newline() {
        let mut cur = Cursor::new("HALT");
        assert_eq!(cur.next_line().map(|l| l.text), Some("HALT"));
        assert!(cur.is_eof());
        assert_eq!(cur.next_line(), None);
    }

    #[test]
    fn empty_source() {
        assert_eq!(Cursor::new("").count(), 0);
    }
}
