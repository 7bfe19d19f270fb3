use std::sync::Arc;

use crate::codec::Codec;
use crate::token_authorizer::TokenAuthorizer;

/// Immutable, shared-across-connections configuration from which
/// `Context`s are constructed: a codec and an optional token authorizer
/// (spec.md §2). Safe for concurrent use by many connections at once.
#[derive(Clone)]
pub struct ContextInfo {
    codec: Arc<dyn Codec>,
    authorizer: Option<Arc<dyn TokenAuthorizer>>,
}

impl ContextInfo {
    pub fn new(codec: Arc<dyn Codec>, authorizer: Option<Arc<dyn TokenAuthorizer>>) -> Self {
        Self { codec, authorizer }
    }

    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    pub fn authorizer(&self) -> Option<&Arc<dyn TokenAuthorizer>> {
        self.authorizer.as_ref()
    }
}
