mod config;
mod error;
mod files;
mod server;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bindsite_common::index::DescriptionIndex;

use config::Config;
use server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting bindsite structure server");

    let config = Config::from_env()?;
    info!(
        pred_dir = %config.pred_dir.display(),
        index_path = %config.index_path.display(),
        threshold = config.search_threshold,
        max_limit = config.search_max_limit,
        "configuration loaded"
    );
    // Searches answer 500 until the index is readable; file routes keep working.
    match DescriptionIndex::load(&config.index_path).await {
        Ok(index) if index.is_empty() => warn!("description index has no entries"),
        Ok(index) => info!(entries = index.len(), "description index readable"),
        Err(e) => warn!(error = %e, "description index unavailable"),
    }

    let addr = config.listen_addr;
    let state = Arc::new(AppState::new(config));
    server::serve(state, addr).await?;
    Ok(())
}
