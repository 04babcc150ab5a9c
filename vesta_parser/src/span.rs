//! Byte spans and human-readable source positions.

use std::fmt;
use std::ops::Range;

/// A half-open byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    // We do this because deriving Into<_> has some inference issues for
    // range indices.
    pub fn into_range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    pub fn text(self, source: &str) -> &str {
        &source[self.into_range()]
    }
}

/// A 1-based line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

const TAB_STOP: i64 = 8;

/// Advances `start` over `text`. Both carriage return and line feed end a
/// line; a mix resolves to whichever count is larger. Tabs move the column
/// to the next multiple of the tab stop.
fn advance(text: &str, start: SourcePosition) -> SourcePosition {
    let mut cr = start.line as i64 - 1;
    let mut lf = cr;
    let mut column = start.column as i64 - 1;
    for ch in text.chars() {
        match ch {
            '\n' => {
                lf += 1;
                column = 0;
            }
            '\r' => {
                cr += 1;
                column = 0;
            }
            '\t' => column += TAB_STOP - column % TAB_STOP,
            _ => column += 1,
        }
    }
    SourcePosition {
        line: (1 + cr.max(lf)) as u32,
        column: (1 + column) as u32,
    }
}

/// The start and end positions of `span` within `source`.
pub fn positions(source: &str, span: Span) -> (SourcePosition, SourcePosition) {
    let origin = SourcePosition { line: 1, column: 1 };
    let start = advance(&source[..span.start as usize], origin);
    let end = advance(span.text(source), start);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_of(source: &str, offset: u32) -> SourcePosition {
        positions(source, Span { start: offset, end: offset }).0
    }

    #[test]
    fn first_line_counts_from_one() {
        assert_eq!(start_of("abc", 0), SourcePosition { line: 1, column: 1 });
        assert_eq!(start_of("abc", 2), SourcePosition { line: 1, column: 3 });
    }

    #[test]
    fn newlines_reset_the_column() {
        let source = "ab\ncd\nef";
        assert_eq!(start_of(source, 3), SourcePosition { line: 2, column: 1 });
        assert_eq!(start_of(source, 7), SourcePosition { line: 3, column: 2 });
    }

    #[test]
    fn crlf_counts_as_one_line_break() {
        let source = "ab\r\ncd";
        assert_eq!(start_of(source, 4), SourcePosition { line: 2, column: 1 });
    }

    #[test]
    fn tabs_expand_to_the_next_multiple_of_eight() {
        let source = "\ta\tb";
        assert_eq!(start_of(source, 1), SourcePosition { line: 1, column: 9 });
        assert_eq!(start_of(source, 2), SourcePosition { line: 1, column: 10 });
        assert_eq!(start_of(source, 3), SourcePosition { line: 1, column: 17 });
    }

    #[test]
    fn end_position_continues_from_the_start() {
        let source = "one\ntwo three";
        let (start, end) = positions(source, Span { start: 4, end: 13 });
        assert_eq!(start, SourcePosition { line: 2, column: 1 });
        assert_eq!(end, SourcePosition { line: 2, column: 10 });
    }
}
