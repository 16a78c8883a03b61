use crate::consumer::SecurityProtocol;
use crate::error::{BrowseError, BrowseResult};
use getset::CopyGetters;
use rdkafka::ClientConfig;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub brokers: Vec<String>,
    pub security_protocol: SecurityProtocol,
    pub timeouts: BrowseTimeouts,
}

impl ConnectionSettings {
    pub fn new(brokers: Vec<String>) -> Self {
        Self {
            brokers,
            security_protocol: SecurityProtocol::Plaintext,
            timeouts: BrowseTimeouts::default(),
        }
    }

    pub fn validate(&self) -> BrowseResult<()> {
        if self.brokers.is_empty() {
            return Err(BrowseError::Configuration(
                "No brokers specified".to_owned(),
            ));
        }
        if let Some(broker) = self.brokers.iter().find(|b| !is_host_port(b)) {
            return Err(BrowseError::Configuration(format!(
                "Broker address '{broker}' isn't in host:port form"
            )));
        }

        Ok(())
    }

    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }
}

fn is_host_port(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((host, port)) => !host.trim().is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

impl TryFrom<&ConnectionSettings> for ClientConfig {
    type Error = BrowseError;

    fn try_from(value: &ConnectionSettings) -> Result<Self, Self::Error> {
        value.validate()?;

        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", value.bootstrap_servers())
            .set("security.protocol", value.security_protocol.to_string())
            .set(
                "socket.connection.setup.timeout.ms",
                value.timeouts.connect().as_millis().to_string(),
            );

        if let Ok(value) = std::env::var("RD_KAFKA_DEBUG") {
            config.set("debug", value);
        }

        Ok(config)
    }
}

/// Upper bounds for every broker call that can hang.
#[derive(Debug, Clone, Copy, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct BrowseTimeouts {
    connect: Duration,
    list_topics: Duration,
    subscribe: Duration,
    /// How long a tail keeps waiting for messages before returning what it has.
    drain: Duration,
}

impl BrowseTimeouts {
    pub fn new(connect: Duration, list_topics: Duration, subscribe: Duration, drain: Duration) -> Self {
        Self {
            connect,
            list_topics,
            subscribe,
            drain,
        }
    }

    pub fn uniform(timeout: Duration) -> Self {
        Self::new(timeout, timeout, timeout, timeout)
    }
}

impl Default for BrowseTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            list_topics: Duration::from_secs(5),
            subscribe: Duration::from_secs(5),
            drain: Duration::from_secs(3),
        }
    }
}
