//! In-memory cluster honouring the same contracts as [`super::KafkaBackend`]: latency is
//! observable by timeouts, an unreachable cluster fails the dial, unknown topics are broker
//! errors and every subscription is counted until it's dropped.

use crate::backend::{
    BrokerBackend, BrokerClient, Subscription, SubscriptionEvent, SubscriptionRequest,
};
use crate::connection_settings::ConnectionSettings;
use crate::error::{BrowseError, BrowseResult};
use crate::queries::fetch_messages::{StartFrom, TopicMessage};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct SimulatedTopic {
    name: String,
    partitions: Vec<Vec<Bytes>>,
}

impl SimulatedTopic {
    pub fn new(name: impl Into<String>, partitions: Vec<Vec<Bytes>>) -> Self {
        Self {
            name: name.into(),
            partitions,
        }
    }

    pub fn single_partition<I, M>(name: impl Into<String>, messages: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Bytes>,
    {
        Self::new(name, vec![messages.into_iter().map(Into::into).collect()])
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, vec![vec![]])
    }
}

#[derive(Debug, Default)]
struct SimulatorState {
    topics: RwLock<Vec<SimulatedTopic>>,
    latency: RwLock<Duration>,
    unreachable: AtomicBool,
    drain_signal_disabled: AtomicBool,
    failure_rate_per_mille: AtomicUsize,
    dial_attempts: AtomicUsize,
    opened_subscriptions: AtomicUsize,
    live_subscriptions: AtomicUsize,
}

impl SimulatorState {
    fn latency(&self) -> Duration {
        self.latency.read().map(|l| *l).unwrap_or_default()
    }

    async fn simulate_network(&self, operation: &str) -> BrowseResult<()> {
        let latency = self.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let rate = self.failure_rate_per_mille.load(Ordering::Relaxed);
        if rate > 0 && rand::random::<f64>() * 1000.0 < rate as f64 {
            warn!("Simulating broker error while {}", operation);
            return Err(BrowseError::Upstream(format!(
                "Simulated error while {operation}"
            )));
        }

        Ok(())
    }

    fn topic(&self, name: &str) -> Option<SimulatedTopic> {
        self.topics
            .read()
            .ok()
            .and_then(|topics| topics.iter().find(|t| t.name == name).cloned())
    }
}

/// Broker double kept entirely in memory. Clones share the same cluster and counters.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    state: Arc<SimulatorState>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topic(self, topic: SimulatedTopic) -> Self {
        self.add_topic(topic);
        self
    }

    pub fn add_topic(&self, topic: SimulatedTopic) {
        if let Ok(mut topics) = self.state.topics.write() {
            topics.push(topic);
        }
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(latency);
        self
    }

    pub fn set_latency(&self, latency: Duration) {
        if let Ok(mut current) = self.state.latency.write() {
            *current = latency;
        }
    }

    pub fn with_failure_rate(self, rate: f64) -> Self {
        self.set_failure_rate(rate);
        self
    }

    /// Probability in `[0, 1]` that any broker call fails with an upstream error.
    pub fn set_failure_rate(&self, rate: f64) {
        let per_mille = (rate.clamp(0.0, 1.0) * 1000.0).round() as usize;
        self.state
            .failure_rate_per_mille
            .store(per_mille, Ordering::Relaxed);
    }

    /// Subscriptions never report drained partitions, like a cluster that keeps the tail open.
    pub fn without_drain_signal(self) -> Self {
        self.state
            .drain_signal_disabled
            .store(true, Ordering::Relaxed);
        self
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.unreachable.store(unreachable, Ordering::Relaxed);
    }

    pub fn dial_attempts(&self) -> usize {
        self.state.dial_attempts.load(Ordering::SeqCst)
    }

    pub fn opened_subscriptions(&self) -> usize {
        self.state.opened_subscriptions.load(Ordering::SeqCst)
    }

    pub fn live_subscriptions(&self) -> usize {
        self.state.live_subscriptions.load(Ordering::SeqCst)
    }

    /// Cluster with the topics the dashboard shows in its `dev` and `sandbox` environments.
    pub fn demo() -> Self {
        let environments: [(&str, &[&str]); 2] = [
            (
                "dev",
                &[
                    "orders",
                    "customers",
                    "payments",
                    "inventory_updates",
                    "user_signups",
                    "product_views",
                ],
            ),
            ("sandbox", &["test_orders", "sandbox_users", "mock_payments"]),
        ];

        let mut backend = Self::new().with_latency(Duration::from_millis(200));
        for (environment, topics) in environments {
            for topic in topics {
                let name = format!("{environment}.{topic}");
                let partitions = (0..3)
                    .map(|partition| {
                        (0..20)
                            .map(|i| demo_message(&name, partition, i))
                            .collect::<Vec<_>>()
                    })
                    .collect();
                backend = backend.with_topic(SimulatedTopic::new(name, partitions));
            }
        }
        backend.with_topic(SimulatedTopic::empty("dev.empty_topic_example"))
    }
}

fn demo_message(topic: &str, partition: i32, index: i64) -> Bytes {
    if index % 3 == 2 {
        return Bytes::from(format!(
            "Simple message {}: plain text event from topic {}",
            index + 1,
            topic
        ));
    }

    let statuses = ["pending", "processed", "failed"];
    let value = serde_json::json!({
        "id": format!("msg_{topic}_{partition}_{index}"),
        "timestamp": Utc::now().to_rfc3339(),
        "payload": {
            "details": format!("Event detail {} for {}", index + 1, topic),
            "status": statuses[(index as usize) % statuses.len()],
        },
        "metadata": {
            "source": "kaflook-simulator",
            "partition": partition,
            "offset": index,
        }
    });
    Bytes::from(value.to_string())
}

#[async_trait]
impl BrokerBackend for SimulatedBackend {
    type Client = SimulatedClient;

    async fn dial(&self, settings: &ConnectionSettings) -> BrowseResult<Self::Client> {
        settings.validate()?;
        self.state.dial_attempts.fetch_add(1, Ordering::SeqCst);
        self.state.simulate_network("connecting").await?;

        if self.state.unreachable.load(Ordering::Relaxed) {
            return Err(BrowseError::Upstream(format!(
                "Could not reach brokers {}",
                settings.bootstrap_servers()
            )));
        }

        debug!("Simulated connection to {}", settings.bootstrap_servers());
        Ok(SimulatedClient {
            state: self.state.clone(),
        })
    }
}

pub struct SimulatedClient {
    state: Arc<SimulatorState>,
}

#[async_trait]
impl BrokerClient for SimulatedClient {
    async fn list_topic_names(&self, _timeout: Duration) -> BrowseResult<Vec<String>> {
        self.state.simulate_network("listing topics").await?;

        let topics = self
            .state
            .topics
            .read()
            .map_err(BrowseError::upstream)?;
        Ok(topics.iter().map(|t| t.name.clone()).collect())
    }

    async fn open_subscription(
        &self,
        request: &SubscriptionRequest,
    ) -> BrowseResult<Box<dyn Subscription>> {
        self.state.simulate_network("subscribing").await?;

        let topic = self.state.topic(&request.topic).ok_or_else(|| {
            BrowseError::Upstream(format!("Topic {} wasn't found", request.topic))
        })?;

        Ok(Box::new(SimulatedSubscription::new(
            self.state.clone(),
            topic,
            request,
        )))
    }
}

struct SimulatedSubscription {
    state: Arc<SimulatorState>,
    partitions: Vec<i32>,
    queues: Vec<VecDeque<TopicMessage>>,
    pending: VecDeque<SubscriptionEvent>,
    next_partition: usize,
    signal_drained: bool,
}

impl SimulatedSubscription {
    fn new(state: Arc<SimulatorState>, topic: SimulatedTopic, request: &SubscriptionRequest) -> Self {
        state.opened_subscriptions.fetch_add(1, Ordering::SeqCst);
        state.live_subscriptions.fetch_add(1, Ordering::SeqCst);
        let signal_drained = !state.drain_signal_disabled.load(Ordering::Relaxed);

        let mut partitions = Vec::with_capacity(topic.partitions.len());
        let mut queues = Vec::with_capacity(topic.partitions.len());
        let mut pending = VecDeque::new();

        for (index, messages) in topic.partitions.into_iter().enumerate() {
            let partition = index as i32;
            let start = match request.start_from {
                StartFrom::Beginning => 0,
                StartFrom::Tail => messages.len().saturating_sub(request.count),
            };
            let queue = messages
                .into_iter()
                .enumerate()
                .skip(start)
                .map(|(offset, payload)| TopicMessage::new(partition, offset as i64, payload))
                .collect::<VecDeque<_>>();

            if queue.is_empty() && signal_drained {
                pending.push_back(SubscriptionEvent::PartitionDrained(partition));
            }
            partitions.push(partition);
            queues.push(queue);
        }

        Self {
            state,
            partitions,
            queues,
            pending,
            next_partition: 0,
            signal_drained,
        }
    }

    /// Round-robin across partitions, each partition strictly in offset order.
    fn next_message(&mut self) -> Option<(TopicMessage, bool)> {
        for _ in 0..self.queues.len() {
            let index = self.next_partition;
            self.next_partition = (self.next_partition + 1) % self.queues.len();

            if let Some(message) = self.queues[index].pop_front() {
                return Some((message, self.queues[index].is_empty()));
            }
        }

        None
    }
}

#[async_trait]
impl Subscription for SimulatedSubscription {
    fn partitions(&self) -> &[i32] {
        &self.partitions
    }

    async fn next_event(&mut self) -> BrowseResult<SubscriptionEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(event);
        }

        match self.next_message() {
            Some((message, drained)) => {
                if drained && self.signal_drained {
                    self.pending.push_back(SubscriptionEvent::PartitionDrained(
                        message.partition_offset.partition(),
                    ));
                }
                Ok(SubscriptionEvent::Message(message))
            }
            // an idle tail waits for producers that never come
            None => std::future::pending().await,
        }
    }
}

impl Drop for SimulatedSubscription {
    fn drop(&mut self) {
        self.state.live_subscriptions.fetch_sub(1, Ordering::SeqCst);
    }
}
