use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// A `(name, args…)` functor used uniformly for method payloads and for
/// structured errors that cross the API boundary. Never carries a stack
/// trace — only what the peer needs to render or react to the failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodableError {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cause: Option<Box<CodableError>>,
}

impl CodableError {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: CodableError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn connection_nonsense(conn_id: &str, detail: impl Into<String>) -> Self {
        Self::new(
            "connection_nonsense",
            vec![Value::String(conn_id.to_string()), Value::String(detail.into())],
        )
    }

    pub fn connection_closed(conn_id: &str, detail: impl Into<String>) -> Self {
        Self::new(
            "connection_closed",
            vec![Value::String(conn_id.to_string()), Value::String(detail.into())],
        )
    }

    pub fn connection_closing(conn_id: &str) -> Self {
        Self::new("connection_closing", vec![Value::String(conn_id.to_string())])
    }

    pub fn could_not_encode(value: Value) -> Self {
        Self::new("could_not_encode", vec![value])
    }

    pub fn bad_use(msg: impl Into<String>) -> Self {
        Self::new("bad_use", vec![Value::String(msg.into())])
    }

    pub fn bad_value(redacted_value: Value, type_tag: impl Into<String>) -> Self {
        Self::new("bad_value", vec![redacted_value, Value::String(type_tag.into())])
    }

    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new("general_error", vec![Value::String(msg.into())])
    }

    /// The kind name, e.g. `"bad_use"`. Used by tests and by callers that
    /// want to branch on the taxonomy without parsing `args`.
    pub fn kind(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for CodableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:?})", self.name, self.args)
    }
}

impl std::error::Error for CodableError {}
