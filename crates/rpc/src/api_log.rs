use quillcore_protocol::Functor;
use quillcore_protocol::Message;
use serde_json::Value;
use tracing::info;
use tracing::warn;

use crate::redaction::redact_args;
use crate::redaction::redact_result;
use crate::schema::MethodSpec;

/// Structured logging of incoming messages and outgoing responses,
/// honoring per-argument / per-result redaction (spec.md §4.5 `ApiLog`).
/// A thin wrapper over `tracing`, mirroring how `codex-mcp-server` logs
/// every request/response via `tracing::info!` rather than `println!`.
#[derive(Clone)]
pub struct ApiLog {
    conn_id: String,
    redaction_enabled: bool,
}

impl ApiLog {
    pub fn new(conn_id: impl Into<String>, redaction_enabled: bool) -> Self {
        Self {
            conn_id: conn_id.into(),
            redaction_enabled,
        }
    }

    /// Logs an incoming `Message`, redacting args per `spec`. `spec` is
    /// `None` when the target could not be resolved (spec.md §4.1: "If
    /// the target for a call is unknown, treat all arguments and results
    /// as redacted."). `safe_target_label` must already have been run
    /// through `Context::safe_target_label` by the caller; a raw token
    /// string must never reach this function (spec.md §4.4).
    pub fn log_incoming(&self, msg: &Message, safe_target_label: &str, spec: Option<&MethodSpec>) {
        let payload = self.redact_payload(&msg.payload, spec);
        info!(
            conn_id = %self.conn_id,
            msg_id = msg.id,
            target_id = %safe_target_id(safe_target_label),
            method = %msg.payload.name,
            args = %payload,
            "incoming message"
        );
    }

    pub fn log_outgoing_ok(&self, msg_id: i64, method: &str, result: &Value, spec: Option<&MethodSpec>) {
        let result_loggable = spec.map(|s| s.result_loggable).unwrap_or(false);
        let shown = if self.redaction_enabled {
            redact_result(result, result_loggable)
        } else {
            result.clone()
        };
        info!(
            conn_id = %self.conn_id,
            msg_id,
            method,
            ok = true,
            result = %shown,
            "outgoing response"
        );
    }

    pub fn log_outgoing_err(&self, msg_id: i64, method: &str, error_name: &str) {
        warn!(
            conn_id = %self.conn_id,
            msg_id,
            method,
            ok = false,
            error = error_name,
            "outgoing response"
        );
    }

    fn redact_payload(&self, payload: &Functor, spec: Option<&MethodSpec>) -> Value {
        if !self.redaction_enabled {
            return Value::Array(payload.args.clone());
        }
        let loggable = spec.map(|s| s.args_loggable.as_slice());
        Value::Array(redact_args(&payload.args, loggable))
    }
}

/// A token string should never appear verbatim in a log line; if
/// `target_id` looks like it could be one (contains more than a bare
/// identifier's worth of structure) callers should prefer passing a
/// pre-computed `safeString`. This best-effort fallback only truncates
/// pathologically long values to bound log size.
fn safe_target_id(raw: &str) -> String {
    if raw.len() > 64 {
        format!("{}...", &raw[..64])
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use quillcore_protocol::Functor;
    use serde_json::json;

    #[test]
    fn redacted_payload_never_equals_original_for_unknown_target() {
        let log = ApiLog::new("conn-1", true);
        let payload = Functor::new("echo", vec![json!("secret")]);
        let shown = log.redact_payload(&payload, None);
        assert_ne!(shown, Value::Array(payload.args));
    }
}
