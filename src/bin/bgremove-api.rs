//! BgRemove API server binary
//!
//! Boots the backend registry (probing availability once), then serves the
//! HTTP API until stopped.

use anyhow::Result;
use bgremove_api::{download::ModelFetcher, registry::ModelRegistry, server};
use clap::Parser;
use std::net::IpAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bgremove-api", version, about = "HTTP background removal service")]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8001)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let fetcher = Arc::new(ModelFetcher::new()?);
    let registry = ModelRegistry::bootstrap(&fetcher);
    let state = Arc::new(server::AppState::new(registry));

    server::serve(state, args.host, args.port).await;
    Ok(())
}
