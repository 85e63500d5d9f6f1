//! Three-way file merger.
//!
//! Reconciles base/ours/theirs blob contents into a merged byte stream by
//! diff-of-diffs chunking:
//!
//! 1. Diff base→ours and base→theirs with the Myers differ.
//! 2. Keep only the `Equal` pairs of each diff (the *matches*) as maps
//!    from base line number to the other side's line number.
//! 3. Walk the three files in lockstep. Runs where both match maps agree
//!    are common ground; the lines between two such runs form a *chunk*.
//! 4. Each chunk resolves by comparing its ours/theirs ranges against base:
//!    unchanged sides yield to the changed side, identical changes are
//!    written once, and anything else becomes a conflict hunk bracketed by
//!    fixed markers.
//!
//! The merger writes to any [`io::Write`] sink and reports how many
//! conflict hunks remained; temp-file placement and atomic rename are the
//! orchestrator's job.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::diff::{diff, lines, EditOp, Line};

/// Opening marker of a conflict hunk.
pub const CONFLICT_OURS: &[u8] = b"<<<<<<< yours\n";
/// Separator between the two sides of a conflict hunk.
pub const CONFLICT_SEP: &[u8] = b"=======\n";
/// Closing marker of a conflict hunk.
pub const CONFLICT_THEIRS: &[u8] = b">>>>>>> theirs\n";

/// Merge `ours` and `theirs` against their common `base`, writing the
/// merged content to `sink`.
///
/// Returns the number of unresolved conflict hunks (0 for a clean merge).
/// Every emitted line is newline-terminated.
///
/// # Errors
/// Returns any error from the sink; the partial output must be discarded.
pub fn merge_blobs(
    base: &[u8],
    ours: &[u8],
    theirs: &[u8],
    sink: &mut dyn Write,
) -> io::Result<usize> {
    let merger = FileMerger::new(lines(base), lines(ours), lines(theirs));
    merger.write_chunks(sink)
}

/// Write a whole-file conflict hunk: all of `ours` above the separator,
/// all of `theirs` below.
///
/// Used for add/add conflicts where there is no base to chunk against.
///
/// # Errors
/// Returns any error from the sink.
pub fn write_conflict_file(ours: &[u8], theirs: &[u8], sink: &mut dyn Write) -> io::Result<()> {
    let ours_lines = lines(ours);
    let theirs_lines = lines(theirs);
    let ours_refs: Vec<&[u8]> = ours_lines.iter().map(|l| l.text.as_slice()).collect();
    let theirs_refs: Vec<&[u8]> = theirs_lines.iter().map(|l| l.text.as_slice()).collect();
    write_conflict_block(&ours_refs, &theirs_refs, sink)
}

// ---------------------------------------------------------------------------
// Chunk geometry
// ---------------------------------------------------------------------------

/// A synchronized position in the three files.
#[derive(Clone, Copy, Debug)]
struct Cursors {
    base: usize,
    a: usize,
    b: usize,
}

/// The next three-way matching position.
#[derive(Clone, Copy, Debug)]
struct MatchPoint {
    base: usize,
    a: usize,
    b: usize,
}

// ---------------------------------------------------------------------------
// FileMerger
// ---------------------------------------------------------------------------

struct FileMerger {
    base: Vec<Line>,
    a: Vec<Line>,
    b: Vec<Line>,
    matches_a: HashMap<usize, usize>,
    matches_b: HashMap<usize, usize>,
}

impl FileMerger {
    fn new(base: Vec<Line>, a: Vec<Line>, b: Vec<Line>) -> Self {
        let matches_a = matches_of(&diff(&base, &a));
        let matches_b = matches_of(&diff(&base, &b));
        Self {
            base,
            a,
            b,
            matches_a,
            matches_b,
        }
    }

    /// Walk the three files, emitting chunks until every stream is spent.
    /// Returns the number of unresolved conflict hunks.
    fn write_chunks(&self, sink: &mut dyn Write) -> io::Result<usize> {
        let mut at = Cursors {
            base: 0,
            a: 0,
            b: 0,
        };
        let mut conflicts = 0;

        loop {
            match self.next_mismatch(at) {
                Some(0) => {
                    // Already at a mismatch: scan for the next position
                    // where base lines up with both sides again.
                    match self.next_match(at.base) {
                        Some(point) => {
                            conflicts += self.emit_chunk(at, point, sink)?;
                            at = Cursors {
                                base: point.base,
                                a: point.a,
                                b: point.b,
                            };
                        }
                        None => {
                            conflicts += self.emit_final_chunk(at, sink)?;
                            return Ok(conflicts);
                        }
                    }
                }
                Some(run) => {
                    // `run` matching lines; emit them as common ground.
                    let point = MatchPoint {
                        base: at.base + run,
                        a: at.a + run,
                        b: at.b + run,
                    };
                    conflicts += self.emit_chunk(at, point, sink)?;
                    at = Cursors {
                        base: point.base,
                        a: point.a,
                        b: point.b,
                    };
                }
                None => {
                    conflicts += self.emit_final_chunk(at, sink)?;
                    return Ok(conflicts);
                }
            }
        }
    }

    /// Length of the matching prefix at `at`, `Some(0)` for an immediate
    /// mismatch, or `None` once the offset runs past all three files.
    fn next_mismatch(&self, at: Cursors) -> Option<usize> {
        let mut i = 0;
        while self.in_bounds(at, i)
            && is_match(&self.matches_a, at.base, at.a, i)
            && is_match(&self.matches_b, at.base, at.b, i)
        {
            i += 1;
        }

        if self.in_bounds(at, i) {
            Some(i)
        } else {
            None
        }
    }

    fn in_bounds(&self, at: Cursors, i: usize) -> bool {
        at.base + i <= self.base.len() || at.a + i <= self.a.len() || at.b + i <= self.b.len()
    }

    /// The next base position that maps into both sides, scanning from
    /// `from_base`.
    fn next_match(&self, from_base: usize) -> Option<MatchPoint> {
        let mut base = from_base;
        while base < self.base.len() {
            if let (Some(&a), Some(&b)) = (self.matches_a.get(&base), self.matches_b.get(&base)) {
                return Some(MatchPoint { base, a, b });
            }
            base += 1;
        }
        None
    }

    fn emit_chunk(
        &self,
        from: Cursors,
        to: MatchPoint,
        sink: &mut dyn Write,
    ) -> io::Result<usize> {
        self.write_chunk(from, Cursors { base: to.base, a: to.a, b: to.b }, sink)
    }

    fn emit_final_chunk(&self, from: Cursors, sink: &mut dyn Write) -> io::Result<usize> {
        let to = Cursors {
            base: self.base.len(),
            a: self.a.len(),
            b: self.b.len(),
        };
        self.write_chunk(from, to, sink)
    }

    /// Resolve one chunk and write it. Returns 1 if a conflict hunk was
    /// emitted, 0 otherwise.
    fn write_chunk(&self, from: Cursors, to: Cursors, sink: &mut dyn Write) -> io::Result<usize> {
        let mut j = from.a;
        let mut k = from.b;
        let mut block_a: Vec<&[u8]> = Vec::new();
        let mut block_b: Vec<&[u8]> = Vec::new();
        let mut changed_a = 0usize;
        let mut changed_b = 0usize;

        for i in from.base..to.base {
            let base_line = &self.base[i];

            if j < to.a {
                let a_line = &self.a[j];
                if base_line.text != a_line.text {
                    changed_a += 1;
                }
                block_a.push(&a_line.text);
                j += 1;
            }

            if k < to.b {
                let b_line = &self.b[k];
                if base_line.text != b_line.text {
                    changed_b += 1;
                }
                block_b.push(&b_line.text);
                k += 1;
            }
        }

        while j < to.a {
            block_a.push(&self.a[j].text);
            changed_a += 1;
            j += 1;
        }
        while k < to.b {
            block_b.push(&self.b[k].text);
            changed_b += 1;
            k += 1;
        }

        let len_base = to.base - from.base;
        let len_a = to.a - from.a;
        let len_b = to.b - from.b;

        // A side equals base when its range is empty alongside an empty
        // base range, or covers the base range line for line unchanged.
        let ours_is_base = (len_base == 0 && len_a == 0)
            || (len_base == len_a && len_a > 0 && changed_a == 0);
        let theirs_is_base = (len_base == 0 && len_b == 0)
            || (len_base == len_b && len_b > 0 && changed_b == 0);
        let both_empty = len_a == 0 && len_b == 0;

        if ours_is_base && theirs_is_base {
            write_block(&block_a, sink)?;
        } else if ours_is_base {
            write_block(&block_b, sink)?;
        } else if theirs_is_base {
            write_block(&block_a, sink)?;
        } else if !both_empty {
            if block_a == block_b {
                write_block(&block_a, sink)?;
            } else {
                write_conflict_block(&block_a, &block_b, sink)?;
                return Ok(1);
            }
        }

        Ok(0)
    }
}

/// Collect the `Equal` pairs of an edit script as `base line → other line`.
fn matches_of(ops: &[EditOp]) -> HashMap<usize, usize> {
    let mut matches = HashMap::new();
    for op in ops {
        if let EditOp::Equal { old, new } = op {
            matches.insert(old.number, new.number);
        }
    }
    matches
}

/// Does base line `base + i` map to line `offset + i` on the given side?
fn is_match(matches: &HashMap<usize, usize>, base: usize, offset: usize, i: usize) -> bool {
    matches.get(&(base + i)) == Some(&(offset + i))
}

fn write_block(block: &[&[u8]], sink: &mut dyn Write) -> io::Result<()> {
    for line in block {
        sink.write_all(line)?;
        sink.write_all(b"\n")?;
    }
    Ok(())
}

fn write_conflict_block(ours: &[&[u8]], theirs: &[&[u8]], sink: &mut dyn Write) -> io::Result<()> {
    sink.write_all(CONFLICT_OURS)?;
    write_block(ours, sink)?;
    sink.write_all(CONFLICT_SEP)?;
    write_block(theirs, sink)?;
    sink.write_all(CONFLICT_THEIRS)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn merge_str(base: &str, ours: &str, theirs: &str) -> (String, usize) {
        let mut out = Vec::new();
        let conflicts =
            merge_blobs(base.as_bytes(), ours.as_bytes(), theirs.as_bytes(), &mut out).unwrap();
        (String::from_utf8(out).unwrap(), conflicts)
    }

    /// Table-driven merge cases: (name, base, ours, theirs, expected,
    /// conflict count).
    const CASES: &[(&str, &str, &str, &str, &str, usize)] = &[
        (
            "identical sides yield themselves",
            "a\nb\nc\n",
            "a\nx\nc\n",
            "a\nx\nc\n",
            "a\nx\nc\n",
            0,
        ),
        (
            "ours equals base takes theirs",
            "a\nb\nc\n",
            "a\nb\nc\n",
            "a\nB\nc\n",
            "a\nB\nc\n",
            0,
        ),
        (
            "theirs equals base takes ours",
            "a\nb\nc\n",
            "a\nA\nc\n",
            "a\nb\nc\n",
            "a\nA\nc\n",
            0,
        ),
        (
            "disjoint hunks merge cleanly",
            "l1\nl2\nl3\nl4\nl5\nl6\nl7\nl8\nl9\nl10\n",
            "ONE\nTWO\nl3\nl4\nl5\nl6\nl7\nl8\nl9\nl10\n",
            "l1\nl2\nl3\nl4\nl5\nl6\nl7\nl8\nNINE\nTEN\n",
            "ONE\nTWO\nl3\nl4\nl5\nl6\nl7\nl8\nNINE\nTEN\n",
            0,
        ),
        (
            "overlapping edits conflict",
            "a\nalpha\nc\n",
            "a\nbeta\nc\n",
            "a\ngamma\nc\n",
            "a\n<<<<<<< yours\nbeta\n=======\ngamma\n>>>>>>> theirs\nc\n",
            1,
        ),
        (
            "remove from ours only",
            "a\nb\nc\nd\n",
            "a\nd\n",
            "a\nb\nc\nd\n",
            "a\nd\n",
            0,
        ),
        (
            "remove from theirs only",
            "a\nb\nc\nd\n",
            "a\nb\nc\nd\n",
            "a\nd\n",
            "a\nd\n",
            0,
        ),
        (
            "same removal on both sides",
            "a\nb\nc\nd\n",
            "a\nd\n",
            "a\nd\n",
            "a\nd\n",
            0,
        ),
        (
            "delete versus modify conflicts",
            "a\nmid\nz\n",
            "a\nz\n",
            "a\nMID\nz\n",
            "a\n<<<<<<< yours\n=======\nMID\n>>>>>>> theirs\nz\n",
            1,
        ),
        (
            "appends on ours only",
            "a\nb\n",
            "a\nb\nc\nd\n",
            "a\nb\n",
            "a\nb\nc\nd\n",
            0,
        ),
        (
            "disjoint insertions merge cleanly",
            "a\nb\nc\n",
            "top\na\nb\nc\n",
            "a\nb\nc\nbottom\n",
            "top\na\nb\nc\nbottom\n",
            0,
        ),
        (
            "two separate conflicts count twice",
            "a\nx\nm\ny\nz\n",
            "a\nx1\nm\ny1\nz\n",
            "a\nx2\nm\ny2\nz\n",
            "a\n<<<<<<< yours\nx1\n=======\nx2\n>>>>>>> theirs\nm\n<<<<<<< yours\ny1\n=======\ny2\n>>>>>>> theirs\nz\n",
            2,
        ),
    ];

    #[test]
    fn merge_table() {
        for (name, base, ours, theirs, expected, conflicts) in CASES {
            let (got, got_conflicts) = merge_str(base, ours, theirs);
            assert_eq!(&got, expected, "wrong content for case: {name}");
            assert_eq!(got_conflicts, *conflicts, "wrong conflict count for case: {name}");
        }
    }

    #[test]
    fn all_empty_inputs() {
        let (out, conflicts) = merge_str("", "", "");
        assert_eq!(out, "");
        assert_eq!(conflicts, 0);
    }

    #[test]
    fn both_sides_delete_everything() {
        let (out, conflicts) = merge_str("a\nb\n", "", "");
        assert_eq!(out, "");
        assert_eq!(conflicts, 0);
    }

    #[test]
    fn idempotent_for_identical_sides() {
        let content = "fn main() {\n    println!(\"hi\");\n}\n";
        let (out, conflicts) = merge_str("old\n", content, content);
        assert_eq!(out, content);
        assert_eq!(conflicts, 0);
    }

    #[test]
    fn trivial_side_rule() {
        let base = "one\ntwo\nthree\n";
        let changed = "one\n2\nthree\nextra\n";

        let (out, conflicts) = merge_str(base, base, changed);
        assert_eq!(out, changed);
        assert_eq!(conflicts, 0);

        let (out, conflicts) = merge_str(base, changed, base);
        assert_eq!(out, changed);
        assert_eq!(conflicts, 0);
    }

    #[test]
    fn conflict_markers_are_exact_bytes() {
        let (out, _) = merge_str("x\n", "a\n", "b\n");
        assert!(out.contains("<<<<<<< yours\n"));
        assert!(out.contains("=======\n"));
        assert!(out.contains(">>>>>>> theirs\n"));
        assert_eq!(out, "<<<<<<< yours\na\n=======\nb\n>>>>>>> theirs\n");
    }

    #[test]
    fn output_lines_are_newline_terminated() {
        // Unterminated final lines come back terminated.
        let (out, conflicts) = merge_str("a", "a", "a");
        assert_eq!(out, "a\n");
        assert_eq!(conflicts, 0);
    }

    #[test]
    fn sink_error_propagates() {
        struct FailingSink;
        impl Write for FailingSink {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("sink closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = merge_blobs(b"a\n", b"b\n", b"a\n", &mut FailingSink).unwrap_err();
        assert_eq!(err.to_string(), "sink closed");
    }

    #[cfg(feature = "proptests")]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arbitrary_file() -> impl Strategy<Value = String> {
            proptest::collection::vec("[ab]{0,2}", 0..10)
                .prop_map(|ls| ls.into_iter().map(|l| l + "\n").collect())
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            /// merge(base, x, x) returns x with zero conflicts.
            #[test]
            fn identical_sides_idempotent(base in arbitrary_file(), x in arbitrary_file()) {
                let (out, conflicts) = merge_str(&base, &x, &x);
                prop_assert_eq!(out, x);
                prop_assert_eq!(conflicts, 0);
            }

            /// merge(base, base, y) = y and merge(base, x, base) = x.
            #[test]
            fn trivial_side(base in arbitrary_file(), y in arbitrary_file()) {
                let (out, conflicts) = merge_str(&base, &base, &y);
                prop_assert_eq!(out, y.clone());
                prop_assert_eq!(conflicts, 0);

                let (out, conflicts) = merge_str(&base, &y, &base);
                prop_assert_eq!(out, y);
                prop_assert_eq!(conflicts, 0);
            }
        }
    }
}
