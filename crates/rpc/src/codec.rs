use quillcore_protocol::Message;
use quillcore_protocol::Response;

use crate::error::RpcError;

/// Encodes/decodes messages, responses, and registered value classes
/// to/from the framed wire format (a single string per direction)
/// (spec.md §4, §6.1, §6.3). External collaborator in spirit; this crate
/// ships one concrete implementation, `JsonCodec`, built on the same
/// `serde_json` the teacher uses for its own JSON-RPC wire format.
pub trait Codec: Send + Sync {
    fn decode_message(&self, raw: &str) -> Result<Message, RpcError>;
    fn encode_response(&self, response: &Response) -> Result<String, RpcError>;
    /// The last-resort frame when even a conservative re-encoding fails:
    /// a `could_not_encode` response bearing only the message id, no
    /// payload (spec.md §4.5 step 9, §4.6).
    fn encode_unencodable(&self, id: i64) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn decode_message(&self, raw: &str) -> Result<Message, RpcError> {
        serde_json::from_str(raw).map_err(|e| RpcError::Decode(e.to_string()))
    }

    fn encode_response(&self, response: &Response) -> Result<String, RpcError> {
        serde_json::to_string(response).map_err(|e| RpcError::Encode(e.to_string()))
    }

    fn encode_unencodable(&self, id: i64) -> String {
        // Hand-built rather than routed back through `encode_response`:
        // if serde_json itself is failing on structured values we do not
        // want to risk hitting the same failure mode twice.
        format!(r#"{{"id":{id},"error":{{"name":"could_not_encode","args":[]}}}}"#)
    }
}
