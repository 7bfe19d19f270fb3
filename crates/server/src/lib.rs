mod app_state;
mod cookies;
mod idle_gc;
mod post_connection;
mod router;
mod run;
mod ws_connection;

pub use app_state::{AppState, DEFAULT_MAX_DRAIN_FRAMES};
pub use cookies::HeaderCookies;
pub use idle_gc::{IdleGc, DEFAULT_IDLE_GC_THRESHOLD};
pub use router::router;
pub use run::run_main;
