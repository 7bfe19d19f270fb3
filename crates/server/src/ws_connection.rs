use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use quillcore_protocol::{CodableError, Response};
use quillcore_rpc::{BaseConnection, DrainHook};
use tokio::sync::mpsc;

use crate::app_state::AppState;
use crate::cookies::HeaderCookies;
use crate::idle_gc::IdleGc;

/// Sends the unsolicited close notice and the final close frame the spec
/// calls for (§4.5 "WsConnection specifics"). Holds only what it needs to
/// reach the write half — the write half itself lives in the writer task.
struct WsDrainHook {
    conn_id: String,
    outbox: mpsc::UnboundedSender<Message>,
}

#[async_trait]
impl DrainHook for WsDrainHook {
    async fn on_begin_close(&self) {
        let notice = Response::unsolicited(CodableError::connection_closing(&self.conn_id));
        if let Ok(text) = serde_json::to_string(&notice) {
            let _ = self.outbox.send(Message::Text(text.into()));
        }
    }

    async fn on_drained(&self) {
        let _ = self.outbox.send(Message::Close(Some(CloseFrame {
            code: 1000,
            reason: "".into(),
        })));
    }
}

pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>, cookies: HeaderCookies) {
    let conn_id = format!("ws-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let conn = Arc::new(BaseConnection::new(conn_id.clone(), state.info.clone(), state.redaction_enabled));
    if conn.bind_meta(&state.server_name, &state.server_version).await.is_err() {
        return;
    }

    let (mut sink, mut stream) = socket.split();
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<Message>();

    let writer = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    let drain_hook = WsDrainHook { conn_id: conn_id.clone(), outbox: outbox_tx.clone() };
    let idle_gc = Arc::new(IdleGc::new(state.idle_gc_threshold));
    let gc_handle = {
        let conn = conn.clone();
        let idle_gc = idle_gc.clone();
        tokio::spawn(async move { idle_gc.run(&conn).await })
    };

    let mut frames_while_closing = 0usize;
    while let Some(next) = stream.next().await {
        let frame = match next {
            Ok(frame) => frame,
            Err(_) => break,
        };
        let text = match frame {
            Message::Text(t) => t.to_string(),
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => continue,
        };

        idle_gc.touch();

        if conn.is_closing() {
            frames_while_closing += 1;
            if frames_while_closing > state.max_drain_frames {
                continue;
            }
        }

        let response = conn.handle_json_message(&text, &cookies).await;
        if outbox_tx.send(Message::Text(response.into())).is_err() {
            break;
        }
    }

    conn.close(&drain_hook).await;
    gc_handle.abort();
    drop(outbox_tx);
    let _ = writer.await;
}
