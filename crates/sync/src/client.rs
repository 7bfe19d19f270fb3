use async_trait::async_trait;
use quillcore_protocol::DocSnapshot;
use quillcore_protocol::Delta;

use crate::error::SyncError;

/// The RPC surface `DocumentPlumbing` drives (spec.md §6.4). Deliberately
/// thin — no transport concerns here, just the three calls the state
/// machine issues. A production caller backs this with a `quillcore-rpc`
/// `Remote` proxy; tests back it with an in-memory fixture.
#[async_trait]
pub trait SyncClient<D: Delta>: Send + Sync {
    /// Initial state.
    async fn snapshot(&self) -> Result<DocSnapshot<D>, SyncError>;

    /// Attempts to merge `delta` (composed against `base_version`). The
    /// returned delta is the correction from the caller's locally-composed
    /// expected result to the server's resulting document.
    async fn apply_delta(&self, base_version: u64, delta: D) -> Result<(u64, D), SyncError>;

    /// Long-polls: does not return until `version > base_version`.
    async fn delta_after(&self, base_version: u64) -> Result<(u64, D), SyncError>;
}
