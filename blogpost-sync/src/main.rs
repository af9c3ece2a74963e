use anyhow::Result;
use blogpost_sync::cli::{run, Cli};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets may come from a local .env file.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();
    tracing::info!("blogpost-sync starting");

    let cli = Cli::parse();
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("blogpost-sync finished"),
        Err(e) => tracing::error!(error = %e, "blogpost-sync exited with error"),
    }
    result
}
