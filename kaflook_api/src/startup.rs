use crate::api::converters::MessageLimits;
use crate::api::{proto, KaflookService};
use crate::app_config::{AppConfig, BackendKind};
use anyhow::Context;
use kaflook::backend::{BrokerBackend, KafkaBackend, SimulatedBackend};
use kaflook::facade::BrowserFacade;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::Server;
use tower_http::trace::TraceLayer;
use tracing::info;

pub async fn run_until_stopped(config: AppConfig) -> Result<(), anyhow::Error> {
    match config.backend {
        BackendKind::Kafka => serve(KafkaBackend, config).await,
        BackendKind::Simulator => {
            let backend = SimulatedBackend::demo()
                .with_latency(Duration::from_millis(config.simulator.latency_ms))
                .with_failure_rate(config.simulator.failure_rate);
            serve(backend, config).await
        }
    }
}

pub fn build_facade<B: BrokerBackend>(
    backend: B,
    config: &AppConfig,
) -> Result<BrowserFacade<B>, anyhow::Error> {
    let facade = BrowserFacade::new(backend, config.connection_settings())
        .with_known_environments(config.known_environments()?)
        .with_internal_topics(config.include_internal_topics);

    Ok(facade)
}

async fn serve<B: BrokerBackend>(backend: B, config: AppConfig) -> Result<(), anyhow::Error> {
    let address: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("While parsing socket address")?;

    let facade = Arc::new(build_facade(backend, &config)?);
    let initial_state = facade.get_connection_status().await;
    info!("Initial connection state: {:?}", initial_state);

    let limits = MessageLimits {
        default_count: config.default_message_count,
        max_count: config.max_message_count,
        default_format: config.default_format,
    };
    let service = KaflookService::new(facade, config.environments.clone(), limits);

    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(proto::FILE_DESCRIPTOR_SET)
        .build_v1alpha()
        .context("While building reflection service")?;

    info!("Listening {address}");
    Server::builder()
        .layer(TraceLayer::new_for_grpc())
        .add_service(reflection)
        .add_service(proto::kaflook_server::KaflookServer::new(service))
        .serve_with_shutdown(address, shutdown_signal())
        .await
        .context("While serving grpc")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("While listening for shutdown signal: {e}");
    }
    info!("Shutting down");
}
