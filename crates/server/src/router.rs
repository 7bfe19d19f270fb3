use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::cookies::HeaderCookies;
use crate::post_connection::post_handler;
use crate::ws_connection::handle_socket;

async fn ws_handler(ws: WebSocketUpgrade, headers: HeaderMap, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cookies = HeaderCookies::from_headers(&headers);
    ws.on_upgrade(move |socket| handle_socket(socket, state, cookies))
}

/// Wires the two transports the spec describes (§4.5): a WebSocket
/// connection for long-lived, multi-message sessions and a one-shot POST
/// endpoint for single-message requests.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ws", get(ws_handler))
        .route("/api", post(post_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
