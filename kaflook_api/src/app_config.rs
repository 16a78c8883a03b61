use anyhow::Context;
use config::Config;
use kaflook::connection_settings::{BrowseTimeouts, ConnectionSettings};
use kaflook::consumer::SecurityProtocol;
use kaflook::format::Format;
use kaflook::queries::list_topics::Environment;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: BackendKind,
    pub kafka: KafkaConfig,
    pub simulator: SimulatorConfig,
    pub environments: Vec<EnvironmentConfig>,
    #[serde(default)]
    pub include_internal_topics: bool,
    pub default_message_count: u32,
    pub max_message_count: u32,
    #[serde(default)]
    pub default_format: Format,
    pub timeouts: TimeoutsConfig,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Kafka,
    Simulator,
}

#[derive(Deserialize, Debug, Clone)]
pub struct KafkaConfig {
    #[serde(default)]
    pub brokers: Vec<String>,
    #[serde(default)]
    pub security_protocol: SecurityProtocol,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct SimulatorConfig {
    pub latency_ms: u64,
    pub failure_rate: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct EnvironmentConfig {
    pub name: String,
    pub label: String,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct TimeoutsConfig {
    pub connect_ms: u64,
    pub list_topics_ms: u64,
    pub subscribe_ms: u64,
    pub drain_ms: u64,
}

impl AppConfig {
    pub fn build() -> Result<Self, anyhow::Error> {
        let config = Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 50002)?
            .set_default("backend", "kafka")?
            .set_default("kafka.brokers", Vec::<String>::new())?
            .set_default("simulator.latency_ms", 200)?
            .set_default("simulator.failure_rate", 0.0)?
            .set_default("environments", Vec::<config::Value>::new())?
            .set_default("default_message_count", 10)?
            .set_default("max_message_count", 500)?
            .set_default("timeouts.connect_ms", 5000)?
            .set_default("timeouts.list_topics_ms", 5000)?
            .set_default("timeouts.subscribe_ms", 5000)?
            .set_default("timeouts.drain_ms", 3000)?
            .add_source(config::File::with_name("appsettings").required(false))
            .add_source(
                config::Environment::with_prefix("App")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("kafka.brokers")
                    .try_parsing(true),
            )
            .build()
            .context("While building config")?;

        let deserialized_config: AppConfig = config
            .try_deserialize()
            .context("While deserializing config")?;

        info!("App config: {deserialized_config:?}");

        Ok(deserialized_config)
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            brokers: self.kafka.brokers.clone(),
            security_protocol: self.kafka.security_protocol,
            timeouts: BrowseTimeouts::new(
                Duration::from_millis(self.timeouts.connect_ms),
                Duration::from_millis(self.timeouts.list_topics_ms),
                Duration::from_millis(self.timeouts.subscribe_ms),
                Duration::from_millis(self.timeouts.drain_ms),
            ),
        }
    }

    pub fn known_environments(&self) -> Result<Vec<Environment>, anyhow::Error> {
        self.environments
            .iter()
            .map(|e| {
                Environment::new(e.name.clone())
                    .with_context(|| format!("While parsing environment '{}'", e.name))
            })
            .collect()
    }
}
