use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use quillcore_protocol::CodableError;
use quillcore_protocol::Message;
use quillcore_protocol::Remote;
use quillcore_protocol::Response;
use tokio::sync::Notify;

use crate::api_log::ApiLog;
use crate::context::Context;
use crate::context_info::ContextInfo;
use crate::dispatch::CallOutcome;
use crate::error::RpcError;
use crate::meta_handler::MetaHandler;
use crate::target::Target;
use crate::token_authorizer::CookieSource;
use crate::token_authorizer::NoCookies;

/// Transport-specific hooks a concrete connection (`WsConnection`,
/// `PostConnection`, built in `quillcore-server` on top of this type)
/// supplies for the drain sequence in spec.md §4.5 `close()`.
#[async_trait]
pub trait DrainHook: Send + Sync {
    /// Called once, when `closing` is first set. SHOULD inform the peer
    /// (e.g. a synthetic `meta.close()` frame on WebSocket).
    async fn on_begin_close(&self);

    /// Called once the in-flight handler count has reached zero.
    /// Tears down the underlying transport.
    async fn on_drained(&self);
}

struct InFlight {
    count: AtomicUsize,
    notify: Notify,
}

impl InFlight {
    fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    fn enter(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }

    async fn wait_for_zero(&self) {
        loop {
            let notified = self.notify.notified();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

struct InFlightGuard<'a>(&'a InFlight);

impl<'a> InFlightGuard<'a> {
    fn enter(in_flight: &'a InFlight) -> Self {
        in_flight.enter();
        Self(in_flight)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.exit();
    }
}

/// Per-client connection lifecycle, transport-agnostic (spec.md §4.5
/// `BaseConnection`). `WsConnection` / `PostConnection` in
/// `quillcore-server` wrap this with an actual socket/request and a
/// `DrainHook`.
pub struct BaseConnection {
    id: String,
    context: Context,
    api_log: ApiLog,
    closing: AtomicBool,
    closed: AtomicBool,
    in_flight: InFlight,
    close_notify: Notify,
}

impl BaseConnection {
    pub fn new(id: impl Into<String>, info: Arc<ContextInfo>, redaction_enabled: bool) -> Self {
        let id = id.into();
        let context = Context::new(info);
        let api_log = ApiLog::new(id.clone(), redaction_enabled);
        Self {
            id,
            context,
            api_log,
            closing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            in_flight: InFlight::new(),
            close_notify: Notify::new(),
        }
    }

    /// Binds the well-known `meta` target for this connection
    /// (spec.md §4.5 "On open", §6.5). Call once, right after
    /// construction.
    pub async fn bind_meta(&self, server_name: &str, server_version: &str) -> Result<(), RpcError> {
        let meta = MetaHandler::new(self.id.clone(), server_name, server_version);
        self.context
            .add_target(Target::new("meta", Arc::new(meta), None))
            .await?;
        self.context.mark_evergreen("meta").await;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// `handleJsonMessage(encodedString) -> encodedString`; never
    /// throws. Implements spec.md §4.5 steps 1-10.
    pub async fn handle_json_message(&self, encoded: &str, cookies: &dyn CookieSource) -> String {
        let decoded = match self.context.decode_message(encoded) {
            Ok(m) => m,
            Err(e) => {
                let error = e.into_codable(&self.id);
                let response = Response::unsolicited(error);
                self.api_log.log_outgoing_err(0, "<decode>", "connection_nonsense");
                return self.encode_or_fallback(response);
            }
        };

        self.handle_message(decoded, cookies).await
    }

    async fn handle_message(&self, msg: Message, cookies: &dyn CookieSource) -> String {
        let spec = self
            .context
            .peek_method_spec_for_logging(&msg.target_id, &msg.payload.name)
            .await;
        let safe_label = self.context.safe_target_label(&msg.target_id);
        self.api_log.log_incoming(&msg, &safe_label, spec.as_ref());

        if self.is_closing() {
            let error = CodableError::connection_closing(&self.id);
            self.api_log.log_outgoing_err(msg.id, &msg.payload.name, "connection_closing");
            return self.encode_or_fallback(Response::err(msg.id, error));
        }

        let _guard = InFlightGuard::enter(&self.in_flight);

        let response = match self.resolve_and_call(&msg, cookies).await {
            Ok(value) => {
                self.api_log
                    .log_outgoing_ok(msg.id, &msg.payload.name, &value, spec.as_ref());
                Response::ok(msg.id, value)
            }
            Err(error) => {
                self.api_log
                    .log_outgoing_err(msg.id, &msg.payload.name, error.kind());
                Response::err(msg.id, error)
            }
        };

        self.encode_or_fallback(response)
    }

    async fn resolve_and_call(
        &self,
        msg: &Message,
        cookies: &dyn CookieSource,
    ) -> Result<serde_json::Value, CodableError> {
        let target = self.context.get_authorized_target(&msg.target_id, cookies).await?;
        let outcome = target.call(&msg.payload).await?;
        match outcome {
            CallOutcome::Value(v) => Ok(normalize_undefined(v)),
            CallOutcome::Proxy(obj) => {
                let remote_id = self
                    .context
                    .get_remote_for(obj)
                    .await
                    .map_err(|e| e.into_codable(&self.id))?;
                let remote = Remote::new(remote_id);
                serde_json::to_value(remote).map_err(|e| CodableError::could_not_encode(serde_json::json!(e.to_string())))
            }
        }
    }

    fn encode_or_fallback(&self, response: Response) -> String {
        match self.context.encode_response(&response) {
            Ok(s) => s,
            Err(e) => {
                let conservative = Response::err(
                    response.id,
                    CodableError::general_error(format!("encode failed: {e}")),
                );
                match self.context.encode_response(&conservative) {
                    Ok(s) => s,
                    Err(_) => self.context.encode_unencodable(response.id),
                }
            }
        }
    }

    /// Idempotent; returns only once the connection has fully quiesced
    /// (spec.md §4.5 `close()`).
    pub async fn close(&self, hook: &dyn DrainHook) {
        if self.closing.swap(true, Ordering::SeqCst) {
            // Another caller is already driving (or has finished) the
            // close sequence; just wait for it.
            while !self.is_closed() {
                self.close_notify.notified().await;
            }
            return;
        }

        hook.on_begin_close().await;
        self.in_flight.wait_for_zero().await;
        hook.on_drained().await;

        self.closed.store(true, Ordering::SeqCst);
        self.close_notify.notify_waiters();
    }
}

/// `undefined`-like absences must be normalized to `null` before crossing
/// the API boundary (spec.md §4.1). `serde_json::Value` has no distinct
/// "undefined", so this is a no-op placeholder kept for symmetry with the
/// spec's step, present so a future richer value type has a single place
/// to hook this rule in.
fn normalize_undefined(v: serde_json::Value) -> serde_json::Value {
    v
}

pub struct NoCookieConnection;

impl NoCookieConnection {
    pub fn source() -> &'static dyn CookieSource {
        &NoCookies
    }
}
