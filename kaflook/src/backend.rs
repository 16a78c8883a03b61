//! Seam between the browsing components and a concrete broker.
//!
//! [`KafkaBackend`] talks to a real cluster through librdkafka, [`SimulatedBackend`] keeps
//! everything in memory and is what the tests run against.

mod kafka;
mod simulator;

pub use kafka::*;
pub use simulator::*;

use crate::connection_settings::ConnectionSettings;
use crate::error::BrowseResult;
use crate::queries::fetch_messages::{StartFrom, TopicMessage};
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait BrokerBackend: Send + Sync + 'static {
    type Client: BrokerClient;

    /// Establishes the shared connection and completes the handshake.
    async fn dial(&self, settings: &ConnectionSettings) -> BrowseResult<Self::Client>;
}

#[async_trait]
pub trait BrokerClient: Send + Sync + 'static {
    /// Raw topic names in the order the cluster reports them.
    async fn list_topic_names(&self, timeout: Duration) -> BrowseResult<Vec<String>>;

    /// Opens a subscription with its own consumer identity.
    async fn open_subscription(
        &self,
        request: &SubscriptionRequest,
    ) -> BrowseResult<Box<dyn Subscription>>;
}

#[derive(Debug, Clone)]
pub struct SubscriptionRequest {
    pub topic: String,
    pub start_from: StartFrom,
    /// Upper bound on what the caller will collect, used to position tails.
    pub count: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Message(TopicMessage),
    /// No more retained messages in this partition at the moment of subscribing.
    PartitionDrained(i32),
}

/// An open subscription. Resources are released when the value is dropped.
#[async_trait]
pub trait Subscription: Send {
    fn partitions(&self) -> &[i32];

    async fn next_event(&mut self) -> BrowseResult<SubscriptionEvent>;
}
