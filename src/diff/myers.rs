//! Myers shortest-edit-script line differ.
//!
//! Classical O((N+M)·D) greedy algorithm: walk edit-distance frontiers `d`,
//! tracking for each diagonal `k` the farthest-reaching x via the `V`
//! vector, snapshotting `V` per `d` into a trace, then backtracking from
//! the end to recover the script. The number of non-[`EditOp::Equal`] ops
//! in the result is the minimal edit distance.

use super::{EditOp, Line};

/// Compute the shortest edit script transforming `a` into `b`.
///
/// Ops are returned in forward order: applying them front to back (keep
/// `Equal`, drop `Delete`, emit `Insert`) reproduces `b` from `a`. Two
/// empty inputs produce an empty script. The differ cannot fail.
#[must_use]
pub fn diff(a: &[Line], b: &[Line]) -> Vec<EditOp> {
    Differ { a, b }.run()
}

/// One backtrack step between frontier points `(prev_x, prev_y) → (x, y)`.
///
/// Coordinates are `isize` because the synthetic predecessor at `d == 0`
/// sits one step outside the grid.
struct Step {
    prev_x: isize,
    prev_y: isize,
    x: isize,
    y: isize,
}

struct Differ<'a> {
    a: &'a [Line],
    b: &'a [Line],
}

impl Differ<'_> {
    fn run(&self) -> Vec<EditOp> {
        if self.a.is_empty() && self.b.is_empty() {
            return Vec::new();
        }

        let trace = self.shortest_path();
        let mut steps = self.backtrack(&trace);
        // Backtracking walks end → start; the script reads start → end.
        steps.reverse();

        let mut ops = Vec::with_capacity(steps.len());
        for step in steps {
            if step.x == step.prev_x {
                let new = self.b[step.prev_y as usize].clone();
                ops.push(EditOp::Insert { new });
            } else if step.y == step.prev_y {
                let old = self.a[step.prev_x as usize].clone();
                ops.push(EditOp::Delete { old });
            } else {
                let old = self.a[step.prev_x as usize].clone();
                let new = self.b[step.prev_y as usize].clone();
                ops.push(EditOp::Equal { old, new });
            }
        }
        ops
    }

    /// Diagonal index into `V`: `k` offset by `max` to become non-negative.
    fn vi(&self, k: isize) -> usize {
        let max = (self.a.len() + self.b.len()) as isize;
        (k + max) as usize
    }

    /// Walk frontiers `d = 0..=max`, recording a snapshot of `V` per `d`.
    /// Stops as soon as the far corner `(n, m)` is reached.
    fn shortest_path(&self) -> Vec<Vec<usize>> {
        let n = self.a.len();
        let m = self.b.len();
        let max = n + m;
        let mut v = vec![0usize; 2 * max + 2];
        let mut trace = Vec::new();

        for d in 0..=(max as isize) {
            let mut k = -d;
            while k <= d {
                let mut x = if k == -d || (k != d && v[self.vi(k - 1)] < v[self.vi(k + 1)]) {
                    v[self.vi(k + 1)]
                } else {
                    v[self.vi(k - 1)] + 1
                };
                let mut y = (x as isize - k) as usize;

                // Extend along the snake of equal lines.
                while x < n && y < m && self.a[x].text == self.b[y].text {
                    x += 1;
                    y += 1;
                }

                v[self.vi(k)] = x;

                if x >= n && y >= m {
                    trace.push(v.clone());
                    return trace;
                }
                k += 2;
            }
            trace.push(v.clone());
        }

        trace
    }

    /// Recover the path end → start from the per-`d` snapshots.
    fn backtrack(&self, trace: &[Vec<usize>]) -> Vec<Step> {
        let mut x = self.a.len() as isize;
        let mut y = self.b.len() as isize;
        let mut steps = Vec::new();

        for d in (0..trace.len()).rev() {
            let v = &trace[d];
            let d = d as isize;
            let k = x - y;

            let prev_k = if k == -d || (k != d && v[self.vi(k - 1)] < v[self.vi(k + 1)]) {
                k + 1
            } else {
                k - 1
            };
            let prev_x = v[self.vi(prev_k)] as isize;
            let prev_y = prev_x - prev_k;

            while x > prev_x && y > prev_y {
                steps.push(Step {
                    prev_x: x - 1,
                    prev_y: y - 1,
                    x,
                    y,
                });
                x -= 1;
                y -= 1;
            }

            if d > 0 {
                steps.push(Step { prev_x, prev_y, x, y });
            }

            x = prev_x;
            y = prev_y;
        }

        steps
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::lines;

    /// Apply an edit script to `a`, reproducing the target sequence.
    fn apply(ops: &[EditOp]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        for op in ops {
            match op {
                EditOp::Insert { new } => out.push(new.text.clone()),
                EditOp::Equal { new, .. } => out.push(new.text.clone()),
                EditOp::Delete { .. } => {}
            }
        }
        out
    }

    fn edit_distance(ops: &[EditOp]) -> usize {
        ops.iter().filter(|op| !op.is_equal()).count()
    }

    fn check(a: &str, b: &str, expected_distance: usize) {
        let la = lines(a.as_bytes());
        let lb = lines(b.as_bytes());
        let ops = diff(&la, &lb);

        let applied = apply(&ops);
        let want: Vec<Vec<u8>> = lb.iter().map(|l| l.text.clone()).collect();
        assert_eq!(applied, want, "applying diff({a:?}, {b:?}) must yield b");
        assert_eq!(
            edit_distance(&ops),
            expected_distance,
            "wrong edit distance for diff({a:?}, {b:?})"
        );
    }

    #[test]
    fn empty_inputs_produce_empty_script() {
        assert!(diff(&[], &[]).is_empty());
    }

    #[test]
    fn identical_inputs_are_all_equal_ops() {
        let la = lines(b"a\nb\nc\n");
        let ops = diff(&la, &la);
        assert_eq!(ops.len(), 3);
        assert!(ops.iter().all(EditOp::is_equal));
    }

    #[test]
    fn insert_into_empty() {
        check("", "a\nb\n", 2);
    }

    #[test]
    fn delete_to_empty() {
        check("a\nb\n", "", 2);
    }

    #[test]
    fn single_line_replacement() {
        check("alpha\n", "beta\n", 2);
    }

    #[test]
    fn middle_insertion() {
        check("a\nc\n", "a\nb\nc\n", 1);
    }

    #[test]
    fn middle_deletion() {
        check("a\nb\nc\n", "a\nc\n", 1);
    }

    #[test]
    fn classic_myers_example() {
        // The ABCABBA / CBABAC example: edit distance 5.
        check("a\nb\nc\na\nb\nb\na\n", "c\nb\na\nb\na\nc\n", 5);
    }

    #[test]
    fn disjoint_edits_at_both_ends() {
        check("one\ntwo\nmid\nnine\nten\n", "uno\ndos\nmid\nnine\nzehn\n", 6);
    }

    #[test]
    fn equal_ops_carry_both_line_numbers() {
        let la = lines(b"x\ncommon\n");
        let lb = lines(b"common\n");
        let ops = diff(&la, &lb);

        let equal: Vec<_> = ops.iter().filter(|op| op.is_equal()).collect();
        assert_eq!(equal.len(), 1);
        if let EditOp::Equal { old, new } = equal[0] {
            assert_eq!(old.number, 1);
            assert_eq!(new.number, 0);
            assert_eq!(old.text, b"common");
        } else {
            unreachable!();
        }
    }

    #[test]
    fn byte_exact_comparison_no_whitespace_normalization() {
        check("a \n", "a\n", 2);
    }

    #[test]
    fn repeated_lines() {
        check("a\na\na\n", "a\na\n", 1);
    }
}
