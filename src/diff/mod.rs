//! Line-level diffing.
//!
//! [`Line`] and [`EditOp`] are the vocabulary shared by the differ and the
//! three-way file merger; [`myers::diff`] computes a shortest edit script
//! between two line sequences.

pub mod myers;

pub use myers::diff;

// ---------------------------------------------------------------------------
// Line
// ---------------------------------------------------------------------------

/// One line of a file: a 0-origin line number and its text, without the
/// trailing newline. Text is raw bytes; comparison is byte-exact, no
/// normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// 0-origin line number within its file.
    pub number: usize,
    /// Line content, newline excluded.
    pub text: Vec<u8>,
}

impl Line {
    /// Create a line.
    #[must_use]
    pub fn new(number: usize, text: impl Into<Vec<u8>>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Split blob content into [`Line`]s.
///
/// Scanner semantics: a trailing newline does not produce a final empty
/// line, but a lone `"\n"` is one empty line and a final unterminated line
/// is kept.
#[must_use]
pub fn lines(data: &[u8]) -> Vec<Line> {
    if data.is_empty() {
        return Vec::new();
    }
    let mut pieces: Vec<&[u8]> = data.split(|b| *b == b'\n').collect();
    if data.ends_with(b"\n") {
        pieces.pop();
    }
    pieces
        .into_iter()
        .enumerate()
        .map(|(number, text)| Line::new(number, text))
        .collect()
}

// ---------------------------------------------------------------------------
// EditOp
// ---------------------------------------------------------------------------

/// One step of an edit script transforming sequence `a` into sequence `b`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditOp {
    /// A line of `b` not present in `a`.
    Insert {
        /// The inserted line (from `b`).
        new: Line,
    },
    /// A line of `a` not present in `b`.
    Delete {
        /// The removed line (from `a`).
        old: Line,
    },
    /// A line present in both sequences.
    Equal {
        /// The line as it appears in `a`.
        old: Line,
        /// The line as it appears in `b`.
        new: Line,
    },
}

impl EditOp {
    /// Returns `true` for [`EditOp::Equal`].
    #[must_use]
    pub const fn is_equal(&self) -> bool {
        matches!(self, Self::Equal { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(ls: &[Line]) -> Vec<String> {
        ls.iter()
            .map(|l| String::from_utf8_lossy(&l.text).into_owned())
            .collect()
    }

    #[test]
    fn lines_empty_input() {
        assert!(lines(b"").is_empty());
    }

    #[test]
    fn lines_single_newline_is_one_empty_line() {
        let ls = lines(b"\n");
        assert_eq!(texts(&ls), vec![""]);
    }

    #[test]
    fn lines_trailing_newline_dropped() {
        let ls = lines(b"a\nb\n");
        assert_eq!(texts(&ls), vec!["a", "b"]);
    }

    #[test]
    fn lines_unterminated_final_line_kept() {
        let ls = lines(b"a\nb");
        assert_eq!(texts(&ls), vec!["a", "b"]);
    }

    #[test]
    fn lines_numbers_are_zero_origin() {
        let ls = lines(b"x\ny\nz\n");
        let numbers: Vec<_> = ls.iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
    }

    #[test]
    fn edit_op_is_equal() {
        assert!(EditOp::Equal {
            old: Line::new(0, "a"),
            new: Line::new(0, "a"),
        }
        .is_equal());
        assert!(!EditOp::Insert {
            new: Line::new(0, "a"),
        }
        .is_equal());
    }
}
