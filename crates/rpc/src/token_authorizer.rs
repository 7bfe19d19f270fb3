use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use quillcore_protocol::BearerToken;

use crate::dispatch::Dispatch;
use crate::error::RpcError;

/// Policy plugged into a `ContextInfo`: recognizes token syntax, derives a
/// token's public id, lists the cookies a token needs, and authorizes a
/// token (plus cookies) into a target object. Spec.md §4.3.
#[async_trait]
pub trait TokenAuthorizer: Send + Sync {
    /// A string guaranteed never to prefix any valid token, used for
    /// freshly minted uncontrolled-target ids.
    fn non_token_prefix(&self) -> &str;

    /// Syntactic recognizer: does `s` look like a token at all?
    fn is_token(&self, s: &str) -> bool;

    /// Parses a string already known to satisfy `is_token`.
    fn token_from_string(&self, s: &str) -> Result<BearerToken, RpcError>;

    /// Which cookies this token's validation needs from the connection.
    async fn cookie_names_for_token(&self, token: &BearerToken) -> Vec<String>;

    /// The authorization decision: `None` means deny.
    async fn get_authorized_target(
        &self,
        token: &BearerToken,
        cookies: &HashMap<String, String>,
    ) -> Option<Arc<dyn Dispatch>>;
}

/// Supplies cookie values for the current connection. Implemented by the
/// transport layer (`WsConnection` / `PostConnection` in `quillcore-server`)
/// over whatever the underlying HTTP upgrade/request actually carried.
pub trait CookieSource: Send + Sync {
    fn cookie(&self, name: &str) -> Option<String>;
}

/// A `CookieSource` with no cookies at all, useful for transports or
/// tests where cookie-bound tokens aren't in play.
pub struct NoCookies;

impl CookieSource for NoCookies {
    fn cookie(&self, _name: &str) -> Option<String> {
        None
    }
}
