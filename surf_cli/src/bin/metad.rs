use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use clap_verbosity_flag::InfoLevel;
use surf_core::cluster::NodeAddr;
use surf_core::{ClusterSpec, wire};
use surf_meta::MetadataStore;
use tokio::net::TcpListener;
use tracing::info;

/// SurfStore metadata server.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<InfoLevel>,

    /// Path to the cluster descriptor file
    config: PathBuf,

    /// Listen address; defaults to the descriptor's `metadata:` entry
    #[arg(short, long, value_name = "HOST:PORT")]
    listen: Option<NodeAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    let cluster = ClusterSpec::load(&cli.config)
        .with_context(|| format!("failed to load cluster descriptor {}", cli.config.display()))?;
    let listen = match cli.listen {
        Some(addr) => addr,
        None => cluster
            .metadata_addr()
            .context("descriptor has no metadata address; pass --listen")?
            .clone(),
    };

    let listener = TcpListener::bind((listen.host.as_str(), listen.port))
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    info!(%listen, block_stores = cluster.num_block_stores(), "metadata server listening");

    let store = Arc::new(MetadataStore::new(cluster));
    wire::serve(listener, store).await?;
    Ok(())
}
