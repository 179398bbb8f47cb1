//! Byte offset to line and column conversion for diagnostics.

use std::fmt;

/// Zero-based line and column (in UTF-8 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

impl LineCol {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Displays one-based, as editors do
impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Line start offsets of a text, for O(log n) lookups
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    /// Scan `text` once, recognising `\n`, `\r\n` and lone `\r` line breaks
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    line_starts.push(i + 1);
                    i += 1;
                }
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    line_starts.push(i + 2);
                    i += 2;
                }
                b'\r' => {
                    line_starts.push(i + 1);
                    i += 1;
                }
                _ => i += 1,
            }
        }
        Self {
            line_starts,
            text_len: text.len(),
        }
    }

    /// Line and column of `offset`; offsets past the end are clamped
    #[must_use]
    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset.min(self.text_len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        };
        let column = offset - self.line_starts[line];
        LineCol {
            line: u32::try_from(line).unwrap_or(u32::MAX),
            column: u32::try_from(column).unwrap_or(u32::MAX),
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset where `line` starts
    #[must_use]
    pub fn line_start(&self, line: u32) -> Option<usize> {
        self.line_starts.get(line as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_unix() {
        let index = LineIndex::new("line 1\nline 2");
        assert_eq!(index.line_col(0), LineCol::new(0, 0));
        assert_eq!(index.line_col(10), LineCol::new(1, 3));
        assert_eq!(index.line_count(), 2);
    }

    #[test]
    fn test_line_col_windows_and_mac() {
        let index = LineIndex::new("a\r\nb\rc");
        assert_eq!(index.line_start(1), Some(3));
        assert_eq!(index.line_start(2), Some(5));
        assert_eq!(index.line_col(5), LineCol::new(2, 0));
    }

    #[test]
    fn test_display_is_one_based_and_clamped() {
        let index = LineIndex::new("ab");
        assert_eq!(index.line_col(1).to_string(), "1:2");
        assert_eq!(index.line_col(99), LineCol::new(0, 2));
    }
}
