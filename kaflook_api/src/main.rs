#![warn(unused_imports)]
#![deny(clippy::clone_on_copy)]
#![deny(forgetting_copy_types)]
#![deny(clippy::style)]

use anyhow::Context;
use kaflook_api::app_config::AppConfig;
use kaflook_api::startup::run_until_stopped;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            console_subscriber::ConsoleLayer::builder()
                .with_default_env()
                .spawn(),
        )
        .with(tracing_subscriber::fmt::layer().with_filter(filter))
        .init();

    info!("Starting kaflook {}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::build().context("While building app config")?;
    info!(
        "Serving {} environments from the {:?} backend",
        config.environments.len(),
        config.backend
    );

    run_until_stopped(config).await?;

    Ok(())
}
