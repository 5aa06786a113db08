//! Line table with LF/CRLF-preserving line slicing.
//!
//! Goals
//! - Single pass over bytes to record '\n' positions.
//! - 0-based line numbers (matching `LineSpan`).
//! - Every line slice keeps its own terminator, so concatenating all
//!   lines reproduces the buffer byte-for-byte.
//! - Binary search for byte→line mapping.
//!
//! Notes
//! - An empty buffer has 0 lines.
//! - "a\nb" and "a\nb\n" both have 2 lines; only the second one's last
//!   line carries a terminator.

use crate::core::model::LineSpan;

/// Line terminator style of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LineTable<'a> {
    text: &'a str,
    /// Start byte of every line
    starts: Vec<usize>,
    /// Byte positions of every '\n'
    nl_positions: Vec<usize>,
}

impl<'a> LineTable<'a> {
    /// Build the table recording every '\n'.
    pub fn build(text: &'a str) -> Self {
        let bytes = text.as_bytes();
        let mut nl_positions = Vec::with_capacity(bytes.len() / 48);
        let mut starts = Vec::with_capacity(bytes.len() / 48 + 1);
        let mut i = 0usize;

        if !bytes.is_empty() {
            starts.push(0);
        }

        // Single pass; record every '\n' offset.
        while let Some(pos) = memchr::memchr(b'\n', &bytes[i..]) {
            let abs = i + pos;
            nl_positions.push(abs);
            i = abs + 1;
            if i < bytes.len() {
                starts.push(i);
            }
        }

        Self {
            text,
            starts,
            nl_positions,
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Line `i` including its terminator (if any).
    pub fn line(&self, i: usize) -> Option<&'a str> {
        let start = *self.starts.get(i)?;
        let end = self
            .starts
            .get(i + 1)
            .copied()
            .unwrap_or(self.text.len());
        Some(&self.text[start..end])
    }

    /// Line `i` without its terminator.
    pub fn content(&self, i: usize) -> Option<&'a str> {
        self.line(i)
            .map(|l| l.trim_end_matches('\n').trim_end_matches('\r'))
    }

    /// Verbatim text of an inclusive span, terminators included.
    pub fn slice(&self, span: LineSpan) -> Option<&'a str> {
        if span.is_empty() || span.end >= self.line_count() {
            return None;
        }
        let start = self.starts[span.start];
        let end = self
            .starts
            .get(span.end + 1)
            .copied()
            .unwrap_or(self.text.len());
        Some(&self.text[start..end])
    }

    /// True when the buffer ends with '\n' (or is empty).
    pub fn ends_with_newline(&self) -> bool {
        self.text.is_empty() || self.text.ends_with('\n')
    }

    /// The more frequent terminator; LF on ties and for single-line buffers.
    pub fn dominant_ending(&self) -> LineEnding {
        let bytes = self.text.as_bytes();
        let crlf = self
            .nl_positions
            .iter()
            .filter(|&&nl| nl > 0 && bytes[nl - 1] == b'\r')
            .count();
        if crlf * 2 > self.nl_positions.len() {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    /// 0-based line covering the given byte offset.
    /// Offsets at '\n' belong to the line the newline terminates.
    pub fn line_of_byte(&self, byte: usize) -> usize {
        match self.starts.binary_search(&byte) {
            Ok(pos) => pos,
            Err(pos) => pos.saturating_sub(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_keep_terminators() {
        let t = LineTable::build("a\r\nb\nc");
        assert_eq!(t.line_count(), 3);
        assert_eq!(t.line(0), Some("a\r\n"));
        assert_eq!(t.content(0), Some("a"));
        assert_eq!(t.line(2), Some("c"));
        assert_eq!(t.line(3), None);
        assert!(!t.ends_with_newline());
    }

    #[test]
    fn trailing_newline_adds_no_empty_line() {
        let t = LineTable::build("a\nb\n");
        assert_eq!(t.line_count(), 2);
        assert!(t.ends_with_newline());
        assert_eq!(LineTable::build("").line_count(), 0);
    }

    #[test]
    fn slices_and_byte_lookup() {
        let text = "one\ntwo\nthree\n";
        let t = LineTable::build(text);
        assert_eq!(t.slice(LineSpan::new(1, 2)), Some("two\nthree\n"));
        assert_eq!(t.slice(LineSpan::new(1, 3)), None);
        assert_eq!(t.line_of_byte(0), 0);
        assert_eq!(t.line_of_byte(3), 0);
        assert_eq!(t.line_of_byte(4), 1);
        assert_eq!(t.line_of_byte(9), 2);
    }

    #[test]
    fn dominant_ending() {
        assert_eq!(LineTable::build("a\r\nb\r\nc\n").dominant_ending(), LineEnding::CrLf);
        assert_eq!(LineTable::build("a\nb\r\n").dominant_ending(), LineEnding::Lf);
        assert_eq!(LineTable::build("a").dominant_ending(), LineEnding::Lf);
    }
}
