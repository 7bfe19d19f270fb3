use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use quillcore_rpc::{BaseConnection, DrainHook};

use crate::app_state::AppState;
use crate::cookies::HeaderCookies;

const REQUIRED_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// No-op `DrainHook` for the one-shot HTTP transport: there is no open
/// socket to notify and nothing left in flight by the time `close()` runs,
/// since the single handler call has already been awaited to completion.
struct NoopDrainHook;

#[async_trait]
impl DrainHook for NoopDrainHook {
    async fn on_begin_close(&self) {}
    async fn on_drained(&self) {}
}

/// `HTTP 400 with {id:-1,error:…}` (spec.md §6.2) for a malformed request —
/// distinct from `Response`, whose `id` is always a non-negative message
/// id, since there was no message to assign one from.
fn bad_request(message: &str) -> axum::response::Response {
    let body = serde_json::json!({
        "id": -1,
        "error": quillcore_protocol::CodableError::bad_use(message.to_string()),
    })
    .to_string();
    (
        StatusCode::BAD_REQUEST,
        [(header::CONTENT_TYPE, REQUIRED_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// Each POST request is its own ephemeral connection: a fresh
/// `BaseConnection`/`Context` bound, used for exactly one message, and
/// closed before the response is sent (spec.md §4.5 "PostConnection
/// specifics" — "handles a single message per request"). Token-authorized
/// state that needs to outlive a single call belongs on the WS transport.
pub async fn post_handler(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("");
    if !content_type.eq_ignore_ascii_case(REQUIRED_CONTENT_TYPE) {
        return bad_request("Content-Type must be application/json; charset=utf-8");
    }

    let text = match std::str::from_utf8(&body) {
        Ok(text) => text,
        Err(_) => return bad_request("request body must be valid UTF-8"),
    };

    let conn_id = format!("post-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let conn = BaseConnection::new(conn_id, state.info.clone(), state.redaction_enabled);
    if conn.bind_meta(&state.server_name, &state.server_version).await.is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "").into_response();
    }

    let cookies = HeaderCookies::from_headers(&headers);
    let mut response_body = conn.handle_json_message(text, &cookies).await;
    conn.close(&NoopDrainHook).await;

    // spec.md §6.2: "response body is one encoded Response terminated by \n".
    response_body.push('\n');
    (StatusCode::OK, [(header::CONTENT_TYPE, REQUIRED_CONTENT_TYPE)], response_body).into_response()
}
