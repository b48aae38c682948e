use std::sync::Arc;

use lantern::config::Config;
use lantern::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting lantern");

    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Failed to initialize: {}", e);
            return Err(e.into());
        }
    };
    cfg.log_summary();
    let cfg = Arc::new(cfg);

    tokio::select! {
        res = server::listener::run(cfg) => {
            if let Err(e) = &res {
                tracing::error!("{:#}", e);
            }
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
