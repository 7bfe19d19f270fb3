use std::collections::HashMap;
use std::sync::Arc;

use quillcore_protocol::CodableError;
use quillcore_protocol::Message;
use quillcore_protocol::Response;
use quillcore_protocol::TargetId;
use rand::RngCore;
use tokio::sync::Mutex;

use crate::context_info::ContextInfo;
use crate::dispatch::Dispatch;
use crate::error::RpcError;
use crate::schema::MethodSpec;
use crate::target::object_identity;
use crate::target::Target;
use crate::token_authorizer::CookieSource;

#[derive(Clone)]
struct CachedAuth {
    cookies: HashMap<String, String>,
}

/// Per-connection registry of `id -> Target` and `directObject -> Remote`
/// bindings, plus cached token-authorization decisions (spec.md §3, §4.2).
/// All maps are behind `tokio::sync::Mutex` rather than `std::sync::Mutex`
/// because authorization can suspend across `.await` points while holding
/// logical ownership of the decision being cached.
pub struct Context {
    info: Arc<ContextInfo>,
    targets: Mutex<HashMap<String, Arc<Target>>>,
    remotes: Mutex<HashMap<usize, String>>,
    token_cache: Mutex<HashMap<String, CachedAuth>>,
    /// Target ids exempt from idle GC (e.g. `meta`).
    evergreen: Mutex<std::collections::HashSet<String>>,
}

impl Context {
    pub fn new(info: Arc<ContextInfo>) -> Self {
        Self {
            info,
            targets: Mutex::new(HashMap::new()),
            remotes: Mutex::new(HashMap::new()),
            token_cache: Mutex::new(HashMap::new()),
            evergreen: Mutex::new(std::collections::HashSet::new()),
        }
    }

    pub fn info(&self) -> &Arc<ContextInfo> {
        &self.info
    }

    pub async fn mark_evergreen(&self, id: impl Into<String>) {
        self.evergreen.lock().await.insert(id.into());
    }

    /// `hasId(id) -> bool`: membership test only, no authorization.
    pub async fn has_id(&self, id: &str) -> bool {
        self.targets.lock().await.contains_key(id)
    }

    /// `addTarget(t) -> Remote`: rejects duplicate ids or duplicate
    /// objects (spec.md §4.2, testable property #3), and rejects an
    /// uncontrolled target whose id doesn't match `[A-Za-z0-9_-]{1,64}`
    /// (spec.md §3 `TargetId`, §8 boundary behavior). Controlled targets
    /// are keyed by their token's id, which has its own shape and isn't
    /// subject to this check.
    pub async fn add_target(&self, target: Target) -> Result<String, RpcError> {
        if !target.is_controlled() && TargetId::parse(target.id()).is_err() {
            return Err(RpcError::InvalidTargetId);
        }
        let mut targets = self.targets.lock().await;
        let mut remotes = self.remotes.lock().await;
        if targets.contains_key(target.id()) {
            return Err(RpcError::DuplicateTargetId(target.id().to_string()));
        }
        let identity = target.object_identity();
        if remotes.contains_key(&identity) {
            return Err(RpcError::DuplicateTargetObject);
        }
        let id = target.id().to_string();
        remotes.insert(identity, id.clone());
        targets.insert(id.clone(), Arc::new(target));
        Ok(id)
    }

    /// `getRemoteFor(proxied) -> Remote`: returns the existing id if the
    /// object is already bound, otherwise mints a fresh non-token-prefixed
    /// id and registers a new uncontrolled `Target` wrapping it.
    pub async fn get_remote_for(&self, object: Arc<dyn Dispatch>) -> Result<String, RpcError> {
        let identity = object_identity(&object);
        {
            let remotes = self.remotes.lock().await;
            if let Some(existing) = remotes.get(&identity) {
                return Ok(existing.clone());
            }
        }
        let prefix = self
            .info
            .authorizer()
            .map(|a| a.non_token_prefix().to_string())
            .unwrap_or_else(|| "local-".to_string());

        loop {
            let candidate = format!("{prefix}{:08x}", rand::rng().next_u32());
            if let Some(authorizer) = self.info.authorizer() {
                if authorizer.is_token(&candidate) {
                    continue;
                }
            }
            let mut targets = self.targets.lock().await;
            if targets.contains_key(&candidate) {
                continue;
            }
            let mut remotes = self.remotes.lock().await;
            if remotes.contains_key(&identity) {
                // Lost a race with a concurrent getRemoteFor for the same
                // object; use the id the other caller installed.
                #[allow(clippy::expect_used)]
                return Ok(remotes.get(&identity).cloned().expect("just checked"));
            }
            let target = Target::new(candidate.clone(), object, None);
            remotes.insert(identity, candidate.clone());
            targets.insert(candidate.clone(), Arc::new(target));
            return Ok(candidate);
        }
    }

    /// `Context.getAuthorizedTarget(x)`: the full algorithm from spec.md
    /// §4.3, including cookie-identity binding (§4.3a).
    pub async fn get_authorized_target(
        &self,
        x: &str,
        cookies: &dyn CookieSource,
    ) -> Result<Arc<Target>, CodableError> {
        let is_token = self.info.authorizer().map(|a| a.is_token(x)).unwrap_or(false);

        if !is_token {
            let targets = self.targets.lock().await;
            return match targets.get(x) {
                Some(t) if !t.is_controlled() => Ok(t.clone()),
                _ => Err(CodableError::bad_use(format!("Unknown target: {x}"))),
            };
        }

        #[allow(clippy::expect_used)]
        let authorizer = self.info.authorizer().expect("is_token implies an authorizer");
        let token = authorizer
            .token_from_string(x)
            .map_err(|_| CodableError::bad_use("Unknown target: <redacted>"))?;

        if let Some(cached) = self.try_cached(&token, cookies).await {
            return Ok(cached);
        }

        let cookie_names = authorizer.cookie_names_for_token(&token).await;
        let mut snapshot = HashMap::with_capacity(cookie_names.len());
        for name in &cookie_names {
            match cookies.cookie(name) {
                Some(v) => {
                    snapshot.insert(name.clone(), v);
                }
                None => return Err(CodableError::bad_use(format!("Unknown target: {}", token.safe_string()))),
            }
        }

        let object = authorizer
            .get_authorized_target(&token, &snapshot)
            .await
            .ok_or_else(|| CodableError::bad_use(format!("Unknown target: {}", token.safe_string())))?;

        let new_target = Arc::new(Target::new(token.id().to_string(), object, Some(token.clone())));
        {
            let mut targets = self.targets.lock().await;
            let mut remotes = self.remotes.lock().await;
            if let Some(old) = targets.get(token.id()) {
                remotes.remove(&old.object_identity());
            }
            remotes.insert(new_target.object_identity(), token.id().to_string());
            targets.insert(token.id().to_string(), new_target.clone());
        }
        self.token_cache
            .lock()
            .await
            .insert(token.id().to_string(), CachedAuth { cookies: snapshot });

        Ok(new_target)
    }

    /// Renders `raw` the way it is allowed to appear in a log line: if the
    /// active authorizer recognizes it as a token, only the `safeString`
    /// (id + elision marker) is ever shown, never the raw string: a token
    /// string logged verbatim would leak its secret (spec.md §4.4, §8
    /// testable property #2). Plain target ids pass through unchanged.
    pub fn safe_target_label(&self, raw: &str) -> String {
        match self.info.authorizer() {
            Some(a) if a.is_token(raw) => match a.token_from_string(raw) {
                Ok(token) => token.safe_string(),
                Err(_) => "<redacted>".to_string(),
            },
            _ => raw.to_string(),
        }
    }

    /// Looks up the currently-bound schema for `target_id` without
    /// performing (or side-effecting) authorization; used purely to
    /// decide what a log line's redaction policy should be before the
    /// call is actually dispatched (spec.md §4.1, §4.5 step 3).
    pub async fn peek_method_spec_for_logging(&self, target_id: &str, method: &str) -> Option<MethodSpec> {
        let lookup_id = match self.info.authorizer() {
            Some(a) if a.is_token(target_id) => a.token_from_string(target_id).ok()?.id().to_string(),
            _ => target_id.to_string(),
        };
        let targets = self.targets.lock().await;
        targets.get(&lookup_id).and_then(|t| t.method_spec(method).cloned())
    }

    async fn try_cached(
        &self,
        token: &quillcore_protocol::BearerToken,
        cookies: &dyn CookieSource,
    ) -> Option<Arc<Target>> {
        let targets = self.targets.lock().await;
        let existing = targets.get(token.id())?;
        let stored = existing.token()?;
        if !stored.same_token(token) {
            return None;
        }
        let cache = self.token_cache.lock().await;
        let cached = cache.get(token.id())?;
        let matches = cached
            .cookies
            .iter()
            .all(|(k, v)| cookies.cookie(k).as_deref() == Some(v.as_str()));
        if matches {
            Some(existing.clone())
        } else {
            None
        }
    }

    /// Discards targets (and their remote-map entries) not accessed since
    /// `now - threshold`, skipping anything marked evergreen. The spec
    /// treats last-access tracking as deployment policy (spec.md §4.2);
    /// callers that want idle GC drive this with their own access clock;
    /// here we take the set of ids to keep directly, which is how
    /// `quillcore-server`'s timer task calls it after consulting its own
    /// per-target last-access map.
    pub async fn gc_except(&self, keep: &std::collections::HashSet<String>) {
        let evergreen = self.evergreen.lock().await;
        let mut targets = self.targets.lock().await;
        let mut remotes = self.remotes.lock().await;
        let doomed: Vec<String> = targets
            .keys()
            .filter(|id| !keep.contains(*id) && !evergreen.contains(*id))
            .cloned()
            .collect();
        for id in doomed {
            if let Some(t) = targets.remove(&id) {
                remotes.remove(&t.object_identity());
            }
        }
    }

    pub async fn target_ids(&self) -> Vec<String> {
        self.targets.lock().await.keys().cloned().collect()
    }

    pub fn decode_message(&self, raw: &str) -> Result<Message, RpcError> {
        self.info.codec().decode_message(raw)
    }

    pub fn encode_response(&self, response: &Response) -> Result<String, RpcError> {
        self.info.codec().encode_response(response)
    }

    pub fn encode_unencodable(&self, id: i64) -> String {
        self.info.codec().encode_unencodable(id)
    }
}
