#![cfg(not(tarpaulin_include))]

use agrolog::app;
use agrolog::config::Config;

/// Main entry point for the web application
///
/// Reads the configuration named by `AGROLOG_CONFIG` (default
/// `agrolog.toml`) and serves the entry and report views.
/// Logging follows `RUST_LOG`, defaulting to `info`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = Config::path_from_env();
    log::info!("loading configuration from {}", path.display());
    let config = Config::load(&path)?;

    app::run(config).await
}
