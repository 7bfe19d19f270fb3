use quillcore_protocol::DocSnapshot;
use quillcore_protocol::Delta;

use crate::error::SyncError;

/// Source tag carried on every `gotLocalDelta` (spec.md §4.7). The
/// dispatcher ignores events whose source equals the instance's own
/// write-back tag, and synthesizes one with this marker to restart the
/// collect cycle (§4.7a, rows 2 and 4).
pub const INTERNAL_SOURCE: &str = "internal-source";

/// Events driving [`crate::plumbing::DocumentPlumbing`] (spec.md §4.7).
#[derive(Debug, Clone)]
pub enum Event<D: Delta> {
    Start,
    GotSnapshot(DocSnapshot<D>),
    GotDeltaAfter {
        base: DocSnapshot<D>,
        version: u64,
        delta: D,
    },
    GotLocalDelta {
        delta: D,
        /// The editor's content immediately before `delta` was applied.
        /// Carried for parity with the source event's signature; this
        /// state machine does not itself need it (it diffs/accumulates on
        /// `delta` alone) but an editor adapter building a
        /// [`crate::doc_change::DocumentChangeList`] does.
        old_contents: D,
        source: String,
    },
    WantDeltaAfter,
    WantApplyDelta,
    GotApplyDelta {
        expected: D,
        version: u64,
        correction: D,
    },
    ApiError(SyncError),
}
