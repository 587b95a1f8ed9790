//! Shortest-edit-script diffing for list reconciliation.
//!
//! Implements the greedy Myers O(ND) algorithm with trace backtracking and
//! groups the resulting per-element operations into [`Delta`] runs. A run
//! of deletions immediately adjacent to a run of insertions over the same
//! span coalesces into a single [`Delta::Change`], mirroring how the
//! reconciler treats replacement: delete-then-insert at one position.
//!
//! The differ is pure; equality is supplied by the caller.

/// One grouped edit operation between an old and a new sequence.
///
/// `source` positions index the old sequence, `target` positions the new
/// one. Applying the deltas in order (or in reverse index order, as the
/// reconciler does) transforms old into new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta<T> {
    /// A span present in both sequences.
    Equal {
        /// Start of the span in the old sequence.
        source: usize,
        /// Start of the span in the new sequence.
        target: usize,
        /// Span length.
        len: usize,
    },
    /// Items inserted before `source` in the old sequence.
    Insert {
        /// Insertion position in the old sequence.
        source: usize,
        /// Start of the inserted items in the new sequence.
        target: usize,
        /// The inserted items, in target order.
        items: Vec<T>,
    },
    /// A span removed from the old sequence.
    Delete {
        /// Start of the removed span in the old sequence.
        source: usize,
        /// Number of removed items.
        len: usize,
    },
    /// A span replaced in place: `len` old items removed at `source`,
    /// `items` inserted there.
    Change {
        /// Start of the replaced span in the old sequence.
        source: usize,
        /// Start of the replacement items in the new sequence.
        target: usize,
        /// Number of removed old items.
        len: usize,
        /// The replacement items, in target order.
        items: Vec<T>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RawOp {
    Equal,
    Delete,
    Insert,
}

/// Diffs with `PartialEq` equality (structural/value equality).
pub fn diff<T: Clone + PartialEq>(old: &[T], new: &[T]) -> Vec<Delta<T>> {
    diff_by(old, new, T::eq)
}

/// Diffs with a caller-supplied equality function.
pub fn diff_by<T: Clone>(old: &[T], new: &[T], eq: impl Fn(&T, &T) -> bool) -> Vec<Delta<T>> {
    group(&shortest_edit(old, new, &eq), new)
}

/// Greedy forward search. Returns the per-element operation sequence, in
/// order from the start of both sequences.
fn shortest_edit<T>(old: &[T], new: &[T], eq: &impl Fn(&T, &T) -> bool) -> Vec<RawOp> {
    let n = old.len() as isize;
    let m = new.len() as isize;
    let max = n + m;
    if max == 0 {
        return Vec::new();
    }
    let offset = max;
    let idx = |k: isize| (k + offset) as usize;

    // v[idx(k)] is the furthest x reached on diagonal k; trace keeps the
    // state before each depth so the backtrack can recover the path.
    let mut v = vec![0isize; (2 * max + 2) as usize];
    let mut trace: Vec<Vec<isize>> = Vec::new();
    let mut depth = 0;

    'search: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
                v[idx(k + 1)]
            } else {
                v[idx(k - 1)] + 1
            };
            let mut y = x - k;
            while x < n && y < m && eq(&old[x as usize], &new[y as usize]) {
                x += 1;
                y += 1;
            }
            v[idx(k)] = x;
            if x >= n && y >= m {
                depth = d;
                break 'search;
            }
            k += 2;
        }
    }

    // Backtrack from (n, m) through the recorded states.
    let mut ops = Vec::new();
    let (mut x, mut y) = (n, m);
    for d in (0..=depth).rev() {
        let v = &trace[d as usize];
        let k = x - y;
        let prev_k = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[idx(prev_k)];
        let prev_y = prev_x - prev_k;
        while x > prev_x && y > prev_y {
            ops.push(RawOp::Equal);
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                ops.push(RawOp::Insert);
                y -= 1;
            } else {
                ops.push(RawOp::Delete);
                x -= 1;
            }
        }
    }
    ops.reverse();
    ops
}

/// Groups single-element operations into [`Delta`] runs.
fn group<T: Clone>(ops: &[RawOp], new: &[T]) -> Vec<Delta<T>> {
    let mut deltas = Vec::new();
    let mut i = 0;
    let (mut source, mut target) = (0usize, 0usize);
    while i < ops.len() {
        if ops[i] == RawOp::Equal {
            let mut len = 0;
            while i < ops.len() && ops[i] == RawOp::Equal {
                len += 1;
                i += 1;
            }
            deltas.push(Delta::Equal {
                source,
                target,
                len,
            });
            source += len;
            target += len;
        } else {
            let (mut deleted, mut inserted) = (0usize, 0usize);
            while i < ops.len() && ops[i] != RawOp::Equal {
                match ops[i] {
                    RawOp::Delete => deleted += 1,
                    RawOp::Insert => inserted += 1,
                    RawOp::Equal => unreachable!(),
                }
                i += 1;
            }
            let items = new[target..target + inserted].to_vec();
            deltas.push(match (deleted, inserted) {
                (0, _) => Delta::Insert {
                    source,
                    target,
                    items,
                },
                (_, 0) => Delta::Delete {
                    source,
                    len: deleted,
                },
                _ => Delta::Change {
                    source,
                    target,
                    len: deleted,
                    items,
                },
            });
            source += deleted;
            target += inserted;
        }
    }
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sequences_are_one_equal_span() {
        let deltas = diff(&[1, 2, 3], &[1, 2, 3]);
        assert_eq!(
            deltas,
            [Delta::Equal {
                source: 0,
                target: 0,
                len: 3
            }]
        );
    }

    #[test]
    fn empty_sequences_yield_no_deltas() {
        let deltas: Vec<Delta<i32>> = diff(&[], &[]);
        assert!(deltas.is_empty());
    }

    #[test]
    fn delete_in_the_middle_and_append() {
        let deltas = diff(&[1, 2, 3], &[1, 3, 4]);
        assert_eq!(
            deltas,
            [
                Delta::Equal {
                    source: 0,
                    target: 0,
                    len: 1
                },
                Delta::Delete { source: 1, len: 1 },
                Delta::Equal {
                    source: 2,
                    target: 1,
                    len: 1
                },
                Delta::Insert {
                    source: 3,
                    target: 2,
                    items: vec![4]
                },
            ]
        );
    }

    #[test]
    fn replacement_coalesces_into_change() {
        let deltas = diff(&[1, 2, 3], &[1, 9, 3]);
        assert_eq!(
            deltas,
            [
                Delta::Equal {
                    source: 0,
                    target: 0,
                    len: 1
                },
                Delta::Change {
                    source: 1,
                    target: 1,
                    len: 1,
                    items: vec![9]
                },
                Delta::Equal {
                    source: 2,
                    target: 2,
                    len: 1
                },
            ]
        );
    }

    #[test]
    fn insert_into_empty() {
        let deltas = diff(&[], &[1, 2]);
        assert_eq!(
            deltas,
            [Delta::Insert {
                source: 0,
                target: 0,
                items: vec![1, 2]
            }]
        );
    }

    #[test]
    fn delete_everything() {
        let deltas = diff(&[1, 2], &[]);
        assert_eq!(deltas, [Delta::Delete { source: 0, len: 2 }]);
    }

    #[test]
    fn custom_equality_controls_matching() {
        let old = ["A".to_string(), "b".to_string()];
        let new = ["a".to_string(), "b".to_string()];
        let deltas = diff_by(&old, &new, |x, y| x.eq_ignore_ascii_case(y));
        assert_eq!(
            deltas,
            [Delta::Equal {
                source: 0,
                target: 0,
                len: 2
            }]
        );
    }

    fn apply<T: Clone>(old: &[T], deltas: &[Delta<T>]) -> Vec<T> {
        let mut out: Vec<T> = old.to_vec();
        for delta in deltas.iter().rev() {
            match delta {
                Delta::Equal { .. } => {}
                Delta::Delete { source, len } => {
                    out.drain(*source..source + len);
                }
                Delta::Insert { source, items, .. } => {
                    out.splice(*source..*source, items.iter().cloned());
                }
                Delta::Change {
                    source,
                    len,
                    items,
                    ..
                } => {
                    out.splice(*source..source + len, items.iter().cloned());
                }
            }
        }
        out
    }

    #[test]
    fn reverse_application_reconstructs_target() {
        let cases: &[(&[i32], &[i32])] = &[
            (&[1, 2, 3, 4, 5], &[5, 4, 3, 2, 1]),
            (&[1, 2, 3], &[1, 3, 4]),
            (&[], &[7]),
            (&[7], &[]),
            (&[1, 1, 2, 2], &[2, 2, 1, 1]),
            (&[1, 3, 5, 7], &[2, 3, 6, 7, 8]),
        ];
        for (old, new) in cases {
            let deltas = diff(old, new);
            assert_eq!(apply(old, &deltas), *new, "old={old:?} new={new:?}");
        }
    }
}
