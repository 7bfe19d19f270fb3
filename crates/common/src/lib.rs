mod config;
mod tracing_init;

pub use config::{Config, ConfigToml};
pub use tracing_init::init_tracing;
