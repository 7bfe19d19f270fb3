use std::sync::Arc;

use quillcore_protocol::BearerToken;
use quillcore_protocol::CodableError;
use quillcore_protocol::Functor;

use crate::dispatch::CallOutcome;
use crate::dispatch::Dispatch;
use crate::schema::MethodSpec;

/// `(id, directObject, schema, token?)`. Immutable once constructed. When
/// `token` is `Some`, `id == token.id()` (spec.md §3).
#[derive(Clone)]
pub struct Target {
    id: String,
    direct_object: Arc<dyn Dispatch>,
    token: Option<BearerToken>,
}

impl Target {
    pub fn new(id: impl Into<String>, direct_object: Arc<dyn Dispatch>, token: Option<BearerToken>) -> Self {
        let id = id.into();
        debug_assert!(
            token.as_ref().map(|t| t.id() == id).unwrap_or(true),
            "controlled targets must be keyed by their token's id"
        );
        Self {
            id,
            direct_object,
            token,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn token(&self) -> Option<&BearerToken> {
        self.token.as_ref()
    }

    pub fn is_controlled(&self) -> bool {
        self.token.is_some()
    }

    pub fn direct_object(&self) -> &Arc<dyn Dispatch> {
        &self.direct_object
    }

    /// An identity key for this target's exposed object, stable for the
    /// object's lifetime, used by `Context`'s `directObject -> Remote` map.
    pub fn object_identity(&self) -> usize {
        object_identity(&self.direct_object)
    }

    pub fn method_spec(&self, method: &str) -> Option<&MethodSpec> {
        self.direct_object.schema().method(method)
    }

    /// `call(payload) -> value | error` (spec.md §4.1). Rejects unknown
    /// methods with `bad_use` before ever touching `direct_object`.
    pub async fn call(&self, payload: &Functor) -> Result<CallOutcome, CodableError> {
        if !self.direct_object.schema().contains(&payload.name) {
            return Err(CodableError::bad_use(format!("Unknown method: {}", payload.name)));
        }
        self.direct_object.call(&payload.name, payload.args.clone()).await
    }
}

pub fn object_identity(obj: &Arc<dyn Dispatch>) -> usize {
    Arc::as_ptr(obj) as *const () as usize
}
