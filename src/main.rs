use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use resgraph::api;
use resgraph::cluster::Registry;
use resgraph::config::Config;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    if let Err(e) = config.validate() {
        error!("{}", e);
        process::exit(1);
    }

    let registry = match Registry::from_config(&config) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    info!(
        "Starting resgraph for {:?} clusters {:?} on {}",
        config.orchestrator,
        registry.names(),
        config.listen
    );
    let api = api::setup(&config.listen, registry, config.static_dir.clone());
    if let Err(e) = api.start().await {
        error!("server stopped: {}", e);
        process::exit(1);
    }
}
