use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use quillcore_common::{init_tracing, Config};
use quillcore_rpc::{ContextInfo, JsonCodec};
use quillcore_server::{run_main, AppState};

/// quillcore command-line entry point.
#[derive(Debug, Parser)]
#[clap(author, version)]
struct QuillcoreCli {
    #[clap(subcommand)]
    subcommand: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the collaborative editing server.
    Serve(ServeArgs),
}

#[derive(Debug, Parser)]
struct ServeArgs {
    /// Path to a TOML configuration file. Missing files fall back to defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = QuillcoreCli::parse();
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        match cli.subcommand {
            Command::Serve(args) => serve(args).await,
        }
    })
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let info = Arc::new(ContextInfo::new(Arc::new(JsonCodec), None));
    let mut state = AppState::new(info, config.server_name.clone(), config.server_version.clone());
    state.max_drain_frames = config.max_drain_frames;
    state.idle_gc_threshold = config.idle_gc_threshold;
    run_main(config.bind_addr, Arc::new(state)).await
}
