use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::CodableError;

/// A `(name, args…)` tuple — the uniform shape for method-call payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Functor {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Functor {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// `Message(msg-id, target-id, payload)`. `target_id` is either a
/// previously bound uncontrolled id or the full bearer-token string; the
/// RPC layer is responsible for telling the two apart (spec.md §6.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: i64,
    pub target_id: String,
    pub payload: Functor,
}

/// `Response(msg-id, result|nil, error|nil)`. Exactly one of `result` /
/// `error` is populated, except that `result = null` with no error is a
/// valid "call succeeded, returned nothing" response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CodableError>,
}

impl Response {
    pub fn ok(id: i64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: i64, error: CodableError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }

    /// A server-originated message with no request correspondence (e.g.
    /// the synthetic close notice) uses `msg-id = 0`.
    pub fn unsolicited(error: CodableError) -> Self {
        Self::err(0, error)
    }
}

/// The wire-side handle for a proxied object: opaque to the peer, usable
/// as a subsequent message's `target_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "$type", rename = "Remote")]
pub struct Remote {
    pub target_id: String,
}

impl Remote {
    pub fn new(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn response_round_trips_through_json() {
        let r = Response::ok(7, Value::String("hi".into()));
        let encoded = serde_json::to_string(&r).expect("encode");
        let decoded: Response = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(r, decoded);
    }

    #[test]
    fn remote_carries_a_type_tag() {
        let remote = Remote::new("local-deadbeef");
        let v = serde_json::to_value(&remote).expect("encode");
        assert_eq!(v["$type"], "Remote");
        assert_eq!(v["target_id"], "local-deadbeef");
    }
}
