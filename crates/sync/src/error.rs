use thiserror::Error;

/// Failures surfaced by the client sync machinery (spec.md §4.7, §7).
/// Unlike [`quillcore_protocol::CodableError`], this never crosses the wire
/// — it is the local, typed shape an editor integration reacts to.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// §4.7 `apiError` — an RPC call (`snapshot`, `applyDelta`, `deltaAfter`)
    /// failed. Treated as fatal for this prototype (spec.md §4.7, last row).
    #[error("{method} failed: {message}")]
    Api { method: String, message: String },

    /// §4.8 — a server delta arrived while local edits were in flight and
    /// outside the `merging` state's rebase handling; applying it directly
    /// would silently diverge the editor from `doc`.
    #[error("version skew: server delta arrived outside the merge flow")]
    VersionSkew,
}
