//! The client side of the core (spec.md §4.7–§4.8): a finite-state
//! controller mediating between a rich-text editor and a server document
//! model through `compose`/`transform`/`diff` deltas. Complements
//! `quillcore-rpc` the way `codex-rs/mcp-client` complements
//! `codex-rs/mcp-server` — same RPC core, opposite end of the wire.

mod client;
mod doc_change;
mod editor;
mod error;
mod event;
mod plumbing;
mod state;

pub use client::SyncClient;
pub use doc_change::DocumentChange;
pub use doc_change::DocumentChangeList;
pub use editor::EditorHandle;
pub use error::SyncError;
pub use event::Event;
pub use event::INTERNAL_SOURCE;
pub use plumbing::DocumentPlumbing;
pub use plumbing::PlumbingHandle;
pub use plumbing::PULL_DELAY;
pub use plumbing::PUSH_DELAY;
pub use state::SyncState;
