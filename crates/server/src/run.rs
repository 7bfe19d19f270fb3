use std::net::SocketAddr;
use std::sync::Arc;

use crate::app_state::AppState;
use crate::router::router;

/// Binds and serves, in the style of the teacher's `mcp-server`
/// `run_main`: construct once, log the bind address, then block forever
/// inside `axum::serve`.
pub async fn run_main(bind_addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(%bind_addr, "quillcore-server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
