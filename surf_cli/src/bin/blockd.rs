use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use clap_verbosity_flag::InfoLevel;
use surf_blocks::BlockStore;
use surf_core::wire;
use tokio::net::TcpListener;
use tracing::info;

/// SurfStore block server: an in-memory, hash-addressed block store.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<InfoLevel>,

    /// Port to listen on (all interfaces)
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    let listener = TcpListener::bind(("0.0.0.0", cli.port))
        .await
        .with_context(|| format!("failed to bind port {}", cli.port))?;
    info!(port = cli.port, "block server listening");

    wire::serve(listener, Arc::new(BlockStore::new())).await?;
    Ok(())
}
