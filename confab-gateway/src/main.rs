//! Confab Gateway - Main entry point.

use anyhow::Result;
use confab_common::config::Config;
use confab_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present, then configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config.observability.log_level, &config.observability.log_format);

    tracing::info!("Confab Gateway v{}", env!("CARGO_PKG_VERSION"));

    // Start the gateway server
    confab_gateway::start_server(&config).await
}
