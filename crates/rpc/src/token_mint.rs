use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use quillcore_protocol::BearerToken;
use rand::distr::Alphanumeric;
use rand::Rng;

use crate::dispatch::Dispatch;
use crate::error::RpcError;
use crate::token_authorizer::TokenAuthorizer;

struct MintedEntry {
    secret: String,
    object: Arc<dyn Dispatch>,
}

/// Optional in-memory token issuer for simple deployments (spec.md §2,
/// `TokenMint`). Tokens are `"{id}-{secret}"`; `id`s are minted
/// sequentially so they never collide, and no cookies are required; this
/// is meant for single-process/dev deployments, not cookie-bound identity
/// (§4.3a), which a production `TokenAuthorizer` would add.
pub struct TokenMint {
    prefix: String,
    entries: Mutex<HashMap<String, MintedEntry>>,
    next_id: Mutex<u64>,
}

impl TokenMint {
    pub fn new(non_token_prefix: impl Into<String>) -> Self {
        Self {
            prefix: non_token_prefix.into(),
            entries: Mutex::new(HashMap::new()),
            next_id: Mutex::new(0),
        }
    }

    /// Mints a fresh token bound to `object` and registers it so
    /// `get_authorized_target` can later resolve it.
    pub fn mint(&self, object: Arc<dyn Dispatch>) -> BearerToken {
        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
            let id = format!("tok-{}", *next);
            *next += 1;
            id
        };
        let secret: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        let token = BearerToken::new(id.clone(), secret.clone());
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, MintedEntry { secret, object });
        token
    }

    pub fn revoke(&self, id: &str) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).remove(id);
    }
}

#[async_trait]
impl TokenAuthorizer for TokenMint {
    fn non_token_prefix(&self) -> &str {
        &self.prefix
    }

    fn is_token(&self, s: &str) -> bool {
        s.starts_with("tok-") && s.matches('-').count() >= 2
    }

    fn token_from_string(&self, s: &str) -> Result<BearerToken, RpcError> {
        // Format: "tok-<id-number>-<secret>"; the id is everything up to
        // the last '-', the secret is what follows.
        let (id, secret) = s
            .rsplit_once('-')
            .ok_or_else(|| RpcError::BadArgument("malformed token".to_string()))?;
        Ok(BearerToken::new(id.to_string(), secret.to_string()))
    }

    async fn cookie_names_for_token(&self, _token: &BearerToken) -> Vec<String> {
        Vec::new()
    }

    async fn get_authorized_target(
        &self,
        token: &BearerToken,
        _cookies: &HashMap<String, String>,
    ) -> Option<Arc<dyn Dispatch>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(token.id())?;
        let expected = BearerToken::new(token.id().to_string(), entry.secret.clone());
        if expected.same_token(token) {
            Some(entry.object.clone())
        } else {
            None
        }
    }
}
