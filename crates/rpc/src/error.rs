use quillcore_protocol::CodableError;
use thiserror::Error;

/// Internal error type for the RPC core, following the teacher's
/// `codex-rs/core/src/error.rs` pattern: one `thiserror` enum per crate,
/// with `#[from]` conversions for the errors that cross in from lower
/// layers, converted to the wire `CodableError` only at the connection
/// boundary (see `RpcError::into_codable`).
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("duplicate target id: {0}")]
    DuplicateTargetId(String),

    #[error("duplicate target object")]
    DuplicateTargetObject,

    #[error("unknown target: {0}")]
    UnknownTarget(String),

    #[error("invalid target id")]
    InvalidTargetId,

    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("could not decode message: {0}")]
    Decode(String),

    #[error("could not encode response: {0}")]
    Encode(String),

    #[error("connection is closing")]
    Closing,

    #[error("connection is closed")]
    Closed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RpcError {
    /// Converts to the wire error shape per spec.md §7's propagation
    /// policy / the §9 "RpcError → CodableError" table in SPEC_FULL.md.
    pub fn into_codable(self, conn_id: &str) -> CodableError {
        match self {
            RpcError::UnknownMethod(m) => CodableError::bad_use(format!("Unknown method: {m}")),
            RpcError::DuplicateTargetId(_) => CodableError::bad_use("Duplicate target ID"),
            RpcError::DuplicateTargetObject => CodableError::bad_use("Duplicate target object"),
            RpcError::UnknownTarget(safe) => CodableError::bad_use(format!("Unknown target: {safe}")),
            RpcError::InvalidTargetId => {
                CodableError::bad_value(serde_json::Value::String("<redacted>".into()), "TargetId")
            }
            RpcError::BadArgument(msg) => {
                CodableError::bad_value(serde_json::Value::String(msg), "Argument")
            }
            RpcError::Decode(detail) => CodableError::connection_nonsense(conn_id, detail),
            RpcError::Encode(_) => {
                CodableError::could_not_encode(serde_json::Value::Null)
            }
            RpcError::Closing => CodableError::connection_closing(conn_id),
            RpcError::Closed => CodableError::connection_closed(conn_id, "connection closed"),
            RpcError::Other(e) => CodableError::general_error(e.to_string()),
        }
    }
}
