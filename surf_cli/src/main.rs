use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::WarnLevel;
use surf_client::{LocMethod, Outcome, SurfClient};
use surf_core::ClusterSpec;

/// SurfStore client: upload, download, and delete files in the cluster.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<WarnLevel>,

    /// Path to the cluster descriptor file
    config: PathBuf,

    /// Block-locating method, "hash" or "dist"
    loc_method: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Upload a local file under its file name
    Upload { filepath: PathBuf },
    /// Download a file into a directory
    Download { filename: String, dest_dir: PathBuf },
    /// Delete a file
    Delete { filename: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // stdout carries only the contractual OK / Not Found
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    // an invalid method must fail before anything is dialed
    let method: LocMethod = cli.loc_method.parse()?;
    let cluster = ClusterSpec::load(&cli.config)
        .with_context(|| format!("failed to load cluster descriptor {}", cli.config.display()))?;
    let client = SurfClient::new(cluster, method)?;

    let outcome = match cli.cmd {
        Cmd::Upload { filepath } => client.upload(&filepath).await?,
        Cmd::Download { filename, dest_dir } => client.download(&filename, &dest_dir).await?,
        Cmd::Delete { filename } => client.delete(&filename).await?,
    };
    match outcome {
        Outcome::Ok => print!("OK"),
        Outcome::NotFound => print!("Not Found"),
    }
    std::io::stdout().flush()?;
    Ok(())
}
