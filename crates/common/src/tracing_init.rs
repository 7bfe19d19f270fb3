/// Installs a `tracing` subscriber writing to stderr with level controlled
/// by `RUST_LOG`, mirroring the teacher's `mcp-server::run_main` ("Users
/// can control the log level with `RUST_LOG`"). Safe to call once per
/// process; a second call is a no-op rather than a panic.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}
