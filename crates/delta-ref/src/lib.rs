//! A minimal, Quill-`Delta`-shaped reference implementation of
//! `quillcore_protocol::Delta`, used by this workspace's own tests and by
//! the demo binary in `quillcore-cli`.
//!
//! Production deployments are expected to swap this out for the real delta
//! algebra library (spec.md §1 names it an external collaborator); nothing
//! in `quillcore-rpc` or `quillcore-sync` depends on this crate directly,
//! only on the `Delta` trait.

use serde::Deserialize;
use serde::Serialize;

use quillcore_protocol::Delta;
use quillcore_protocol::Priority;

/// One operation in a plain-text edit script. Formatting attributes are
/// out of scope here (rich-text rendering is a non-goal of the core, per
/// spec.md §1) — only the insert/retain/delete skeleton that a real delta
/// library would layer attributes on top of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Retain(usize),
    Insert(String),
    Delete(usize),
}

impl Op {
    fn input_len(&self) -> usize {
        match self {
            Op::Retain(n) | Op::Delete(n) => *n,
            Op::Insert(_) => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TextDelta {
    pub ops: Vec<Op>,
}

impl TextDelta {
    pub fn retain(mut self, n: usize) -> Self {
        if n > 0 {
            self.push(Op::Retain(n));
        }
        self
    }

    pub fn insert(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.push(Op::Insert(text));
        }
        self
    }

    pub fn delete(mut self, n: usize) -> Self {
        if n > 0 {
            self.push(Op::Delete(n));
        }
        self
    }

    fn push(&mut self, op: Op) {
        // Merge with the previous op when possible, mirroring Quill's
        // Delta.push compaction so composed/transformed deltas don't grow
        // unboundedly with no-op fragments.
        match (self.ops.last_mut(), &op) {
            (Some(Op::Retain(a)), Op::Retain(b)) => *a += b,
            (Some(Op::Delete(a)), Op::Delete(b)) => *a += b,
            (Some(Op::Insert(a)), Op::Insert(b)) => a.push_str(b),
            _ => self.ops.push(op),
        }
    }

    fn chop(mut self) -> Self {
        if let Some(Op::Retain(_)) = self.ops.last() {
            self.ops.pop();
        }
        self
    }

    /// Apply this delta to a plain-text document, returning the result.
    /// Panics if the delta's retain/delete lengths run past the end of
    /// `doc` — a malformed delta, which a real production delta library
    /// would reject at construction instead.
    pub fn apply(&self, doc: &str) -> String {
        let chars: Vec<char> = doc.chars().collect();
        let mut pos = 0usize;
        let mut out = String::new();
        for op in &self.ops {
            match op {
                Op::Retain(n) => {
                    let end = (pos + n).min(chars.len());
                    out.extend(&chars[pos..end]);
                    pos = end;
                }
                Op::Insert(text) => out.push_str(text),
                Op::Delete(n) => {
                    pos = (pos + n).min(chars.len());
                }
            }
        }
        out.extend(&chars[pos..]);
        out
    }
}

/// Splits/consumes ops from a delta's op list in arbitrary-length chunks,
/// the way `compose`/`transform` need to walk two op streams in lockstep.
struct OpCursor<'a> {
    ops: &'a [Op],
    index: usize,
    /// How much of `ops[index]` has already been consumed (chars for
    /// Insert, units for Retain/Delete).
    offset: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Kind {
    Retain,
    Insert,
    Delete,
    Nothing,
}

impl<'a> OpCursor<'a> {
    fn new(ops: &'a [Op]) -> Self {
        Self {
            ops,
            index: 0,
            offset: 0,
        }
    }

    fn has_next(&self) -> bool {
        self.peek_len() < usize::MAX
    }

    fn peek_kind(&self) -> Kind {
        match self.ops.get(self.index) {
            None => Kind::Nothing,
            Some(Op::Retain(_)) => Kind::Retain,
            Some(Op::Insert(_)) => Kind::Insert,
            Some(Op::Delete(_)) => Kind::Delete,
        }
    }

    /// Remaining length of the current op, or `usize::MAX` if exhausted.
    fn peek_len(&self) -> usize {
        match self.ops.get(self.index) {
            None => usize::MAX,
            Some(Op::Insert(s)) => s.chars().count() - self.offset,
            Some(Op::Retain(n)) | Some(Op::Delete(n)) => n - self.offset,
        }
    }

    /// Consume up to `max_len` units of the current op (or the whole op,
    /// for an `Insert`, which has no natural "length" to cap by other than
    /// its own size — matching Quill's iterator, which never splits an
    /// insert shorter than requested).
    fn next(&mut self, max_len: usize) -> Op {
        let op = &self.ops[self.index];
        let remaining = self.peek_len();
        let take = remaining.min(max_len);
        let result = match op {
            Op::Retain(_) => Op::Retain(take),
            Op::Delete(_) => Op::Delete(take),
            Op::Insert(s) => {
                let chars: Vec<char> = s.chars().collect();
                let take_insert = take.min(chars.len() - self.offset);
                let slice: String = chars[self.offset..self.offset + take_insert].iter().collect();
                let new_offset = self.offset + take_insert;
                if new_offset >= chars.len() {
                    self.offset = 0;
                    self.index += 1;
                } else {
                    self.offset = new_offset;
                }
                return Op::Insert(slice);
            }
        };
        if take >= remaining {
            self.offset = 0;
            self.index += 1;
        } else {
            self.offset += take;
        }
        result
    }
}

impl Delta for TextDelta {
    fn empty() -> Self {
        TextDelta::default()
    }

    fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn compose(&self, other: &Self) -> Self {
        let mut this_iter = OpCursor::new(&self.ops);
        let mut other_iter = OpCursor::new(&other.ops);
        let mut result = TextDelta::default();

        while this_iter.has_next() || other_iter.has_next() {
            if other_iter.peek_kind() == Kind::Insert {
                if let Op::Insert(s) = other_iter.next(usize::MAX) {
                    result.push(Op::Insert(s));
                }
                continue;
            }
            if this_iter.peek_kind() == Kind::Delete {
                if let Op::Delete(n) = this_iter.next(usize::MAX) {
                    result.push(Op::Delete(n));
                }
                continue;
            }

            let length = this_iter.peek_len().min(other_iter.peek_len());
            let this_op = this_iter.next(length);
            let other_op = other_iter.next(length);

            match other_op {
                Op::Retain(n) => match this_op {
                    Op::Retain(_) => result.push(Op::Retain(n)),
                    Op::Insert(s) => result.push(Op::Insert(s)),
                    Op::Delete(n) => result.push(Op::Delete(n)),
                },
                Op::Delete(n) => {
                    // An insert immediately deleted cancels out; a delete
                    // over already-retained text is a real delete.
                    if !matches!(this_op, Op::Insert(_)) {
                        result.push(Op::Delete(n));
                    }
                }
                Op::Insert(_) => unreachable!("insert handled above"),
            }
        }
        result.chop()
    }

    fn transform(base: &Self, over: &Self, priority: Priority) -> Self {
        let base_has_priority = matches!(priority, Priority::Remote);
        let mut base_iter = OpCursor::new(&base.ops);
        let mut over_iter = OpCursor::new(&over.ops);
        let mut result = TextDelta::default();

        while base_iter.has_next() || over_iter.has_next() {
            if base_iter.peek_kind() == Kind::Insert
                && (base_has_priority || over_iter.peek_kind() != Kind::Insert)
            {
                if let Op::Insert(s) = base_iter.next(usize::MAX) {
                    result.push(Op::Retain(s.chars().count()));
                }
                continue;
            }
            if over_iter.peek_kind() == Kind::Insert {
                if let Op::Insert(s) = over_iter.next(usize::MAX) {
                    result.push(Op::Insert(s));
                }
                continue;
            }

            let length = base_iter.peek_len().min(over_iter.peek_len());
            let base_op = base_iter.next(length);
            let over_op = over_iter.next(length);

            if matches!(base_op, Op::Delete(_)) {
                // Already gone; over's op at this position is moot.
                continue;
            } else if let Op::Delete(n) = over_op {
                result.push(Op::Delete(n));
            } else {
                result.push(Op::Retain(length));
            }
        }
        result.chop()
    }

    fn diff(a: &Self, b: &Self) -> Self {
        let a_text = a.apply("");
        let b_text = b.apply("");
        diff_text(&a_text, &b_text)
    }
}

/// Common-prefix/common-suffix diff: not minimal, but a correct edit
/// script turning `a` into `b`, which is all a reference test fixture
/// needs. A real delta library would use a proper LCS/Myers diff.
fn diff_text(a: &str, b: &str) -> TextDelta {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prefix = 0;
    while prefix < a.len() && prefix < b.len() && a[prefix] == b[prefix] {
        prefix += 1;
    }

    let mut suffix = 0;
    while suffix < a.len() - prefix
        && suffix < b.len() - prefix
        && a[a.len() - 1 - suffix] == b[b.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let mut delta = TextDelta::default().retain(prefix);
    let deleted = a.len() - prefix - suffix;
    let inserted: String = b[prefix..b.len() - suffix].iter().collect();
    delta = delta.delete(deleted).insert(inserted);
    delta.retain(suffix)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn apply_inserts_retains_and_deletes() {
        let d = TextDelta::default().retain(2).delete(1).insert("XY");
        assert_eq!(d.apply("hello"), "heXYlo");
    }

    #[test]
    fn compose_is_equivalent_to_sequential_apply() {
        let doc = "hello world";
        let a = TextDelta::default().retain(6).insert("brave new ");
        let b = TextDelta::default().retain(6).delete(5).insert("earth");

        let composed = a.compose(&b);
        let sequential = b.apply(&a.apply(doc));
        assert_eq!(composed.apply(doc), sequential);
    }

    #[test]
    fn diff_round_trips() {
        let a = "hello world";
        let b = "hello brave world";
        let d = TextDelta::diff(&TextDelta::default().insert(a), &TextDelta::default().insert(b));
        assert_eq!(d.apply(a), b);
    }

    #[test]
    fn transform_preserves_convergence() {
        let doc = "abc";
        let server = TextDelta::default().retain(3).insert("X");
        let local = TextDelta::default().retain(1).insert("Y");

        let local_rebased = TextDelta::transform(&server, &local, Priority::Remote);
        let server_rebased = TextDelta::transform(&local, &server, Priority::Local);

        let via_server_first = local_rebased.apply(&server.apply(doc));
        let via_local_first = server_rebased.apply(&local.apply(doc));
        assert_eq!(via_server_first, via_local_first);
    }

    #[test]
    fn is_empty_reports_identity_element() {
        assert!(TextDelta::empty().is_empty());
        assert!(!TextDelta::default().insert("x").is_empty());
    }
}
