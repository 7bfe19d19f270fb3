//! Wire types and the delta-algebra contract shared by the RPC core and the
//! client sync state machine. Analogous in role to `codex-rs/protocol` and
//! `codex-rs/mcp-types` in the teacher repo: small, dependency-light, and
//! imported by everything else in the workspace.

mod delta;
mod error;
mod message;
mod target_id;
mod token;

pub use delta::DocSnapshot;
pub use delta::Delta;
pub use delta::Priority;
pub use error::CodableError;
pub use message::Functor;
pub use message::Message;
pub use message::Remote;
pub use message::Response;
pub use target_id::TargetId;
pub use token::BearerToken;
