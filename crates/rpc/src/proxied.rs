use std::sync::Arc;

use crate::dispatch::CallOutcome;
use crate::dispatch::Dispatch;

/// Sentinel wrapper a method implementation returns to instruct the core
/// to expose the wrapped object as a new proxied target and send an
/// opaque handle to the peer (spec.md §2 `ProxiedObject`). Converts
/// directly into the `CallOutcome` the dispatcher matches on.
pub struct ProxiedObject(Arc<dyn Dispatch>);

impl ProxiedObject {
    pub fn new(object: Arc<dyn Dispatch>) -> Self {
        Self(object)
    }
}

impl From<ProxiedObject> for CallOutcome {
    fn from(p: ProxiedObject) -> Self {
        CallOutcome::Proxy(p.0)
    }
}
