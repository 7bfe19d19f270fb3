use std::sync::Arc;
use std::time::Duration;

use quillcore_rpc::ContextInfo;

use crate::idle_gc::DEFAULT_IDLE_GC_THRESHOLD;

/// Bound (default 100) on additional frames dispatched while a
/// `WsConnection` is draining (spec.md §4.5 "WsConnection specifics").
pub const DEFAULT_MAX_DRAIN_FRAMES: usize = 100;

/// Shared, immutable-after-construction state handed to every axum
/// handler via `Router::with_state` — the per-process analogue of the
/// teacher's `MessageProcessor` constructor arguments, but without a
/// per-connection mutable half (each connection builds its own
/// `BaseConnection`/`Context`, per spec.md §3 Lifecycle).
pub struct AppState {
    pub info: Arc<ContextInfo>,
    pub server_name: String,
    pub server_version: String,
    pub redaction_enabled: bool,
    pub max_drain_frames: usize,
    pub idle_gc_threshold: Duration,
}

impl AppState {
    pub fn new(info: Arc<ContextInfo>, server_name: impl Into<String>, server_version: impl Into<String>) -> Self {
        Self {
            info,
            server_name: server_name.into(),
            server_version: server_version.into(),
            redaction_enabled: true,
            max_drain_frames: DEFAULT_MAX_DRAIN_FRAMES,
            idle_gc_threshold: DEFAULT_IDLE_GC_THRESHOLD,
        }
    }
}
