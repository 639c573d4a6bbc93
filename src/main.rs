use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ragserve::{Container, ContainerConfig, Router, Server};

#[derive(Parser)]
#[command(name = "ragserve")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long)]
    verbose: bool,

    /// Port to serve on.
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Where the index, metadata, and checkpoint files live.
    #[arg(long, default_value = "data")]
    data_dir: String,

    /// Directory scanned for new source documents.
    #[arg(long, default_value = "public/sources")]
    sources_dir: String,

    /// Directory served for unmatched GET paths.
    #[arg(long, default_value = "public")]
    public_dir: String,

    /// Use deterministic in-process collaborators instead of the HTTP
    /// embedding/generation services.
    #[arg(long)]
    mock_services: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let container = Container::new(ContainerConfig {
        data_dir: cli.data_dir,
        sources_dir: cli.sources_dir,
        public_dir: cli.public_dir,
        mock_services: cli.mock_services,
    })?;

    let shutdown = CancellationToken::new();

    // Background ingestion runs independently of the serving path.
    let ingestion = Arc::clone(container.ingestion());
    let ingestion_shutdown = shutdown.clone();
    let ingestion_task = tokio::spawn(async move {
        ingestion.run(ingestion_shutdown).await;
    });

    let router = Arc::new(Router::new(
        Arc::clone(container.corpus()),
        Arc::clone(container.query_use_case()),
        Arc::clone(container.assets()),
    ));
    let server = Server::new(router, Arc::clone(container.rate_limiter()));

    let listener = TcpListener::bind(("0.0.0.0", cli.port)).await?;

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_shutdown.cancel();
        }
    });

    server.run(listener, shutdown).await?;
    let _ = ingestion_task.await;

    info!("Bye");
    Ok(())
}
