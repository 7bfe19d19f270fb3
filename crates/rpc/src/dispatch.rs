use std::sync::Arc;

use async_trait::async_trait;
use quillcore_protocol::CodableError;
use serde_json::Value;

use crate::schema::Schema;

/// The result of a successful method call: either an ordinary value, or a
/// sentinel instructing the dispatcher to expose the wrapped object as a
/// new target and hand the peer an opaque `Remote` (spec.md §9 "Proxied
/// objects": `Result = Value(v) | Proxy(directObject)`).
pub enum CallOutcome {
    Value(Value),
    Proxy(Arc<dyn Dispatch>),
}

impl CallOutcome {
    pub fn value(v: Value) -> Self {
        CallOutcome::Value(v)
    }

    pub fn proxy(obj: Arc<dyn Dispatch>) -> Self {
        CallOutcome::Proxy(obj)
    }
}

/// One exposed Rust type's reflective surface: its `Schema`, and the
/// ability to dispatch a named call to itself. One concrete implementation
/// per exposed type (spec.md §9); `MetaHandler` is the built-in example.
#[async_trait]
pub trait Dispatch: Send + Sync {
    fn schema(&self) -> &Schema;

    /// Positionally invokes `method` with `args`. Callers (i.e. `Target`)
    /// are expected to have already checked `schema().contains(method)`;
    /// implementations may still defend against being called directly
    /// with an unregistered name.
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<CallOutcome, CodableError>;
}
