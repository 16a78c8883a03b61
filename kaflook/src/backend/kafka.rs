use crate::admin::AdminWrapper;
use crate::backend::{
    BrokerBackend, BrokerClient, Subscription, SubscriptionEvent, SubscriptionRequest,
};
use crate::connection_settings::ConnectionSettings;
use crate::consumer::{AutoOffsetReset, ConsumerWrapper};
use crate::error::{BrowseError, BrowseResult};
use crate::queries::fetch_messages::{StartFrom, TopicMessage};
use async_trait::async_trait;
use rdkafka::consumer::Consumer;
use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use rdkafka::{Message, Offset, TopicPartitionList};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use uuid::Uuid;

/// Backend for a real Kafka cluster.
#[derive(Debug, Default, Clone, Copy)]
pub struct KafkaBackend;

pub struct KafkaClient {
    admin: Arc<AdminWrapper>,
    settings: ConnectionSettings,
}

#[async_trait]
impl BrokerBackend for KafkaBackend {
    type Client = KafkaClient;

    #[tracing::instrument(skip_all, fields(brokers = %settings.bootstrap_servers()))]
    async fn dial(&self, settings: &ConnectionSettings) -> BrowseResult<Self::Client> {
        let settings = settings.clone();
        let timeout = settings.timeouts.connect();

        run_blocking(move || {
            let admin = AdminWrapper::create(&settings)?;

            // librdkafka connects lazily, a metadata round trip is the handshake
            let metadata = admin
                .inner()
                .fetch_metadata(None, Timeout::After(timeout))
                .map_err(|e| kafka_error("connecting", timeout, e))?;
            debug!(
                "Connected to cluster with {} brokers",
                metadata.brokers().len()
            );

            BrowseResult::Ok(KafkaClient {
                admin: Arc::new(admin),
                settings,
            })
        })
        .await
    }
}

#[async_trait]
impl BrokerClient for KafkaClient {
    async fn list_topic_names(&self, timeout: Duration) -> BrowseResult<Vec<String>> {
        let admin = self.admin.clone();

        run_blocking(move || {
            let metadata = admin
                .inner()
                .fetch_metadata(None, Timeout::After(timeout))
                .map_err(|e| kafka_error("listing topics", timeout, e))?;

            let names = metadata
                .topics()
                .iter()
                .map(|topic| topic.name().to_owned())
                .collect::<Vec<_>>();

            BrowseResult::Ok(names)
        })
        .await
    }

    #[tracing::instrument(skip_all, fields(topic = %request.topic))]
    async fn open_subscription(
        &self,
        request: &SubscriptionRequest,
    ) -> BrowseResult<Box<dyn Subscription>> {
        let settings = self.settings.clone();
        let request = request.clone();

        let subscription = run_blocking(move || KafkaSubscription::open(&settings, &request)).await?;

        Ok(Box::new(subscription))
    }
}

pub struct KafkaSubscription {
    consumer: ConsumerWrapper,
    partitions: Vec<i32>,
    windows: HashMap<i32, PartitionWindow>,
    pending: VecDeque<SubscriptionEvent>,
}

impl KafkaSubscription {
    fn open(settings: &ConnectionSettings, request: &SubscriptionRequest) -> BrowseResult<Self> {
        let timeout = request.timeout;
        let group = format!("kaflook-{}", Uuid::now_v7());
        let consumer =
            ConsumerWrapper::create_for_browsing(settings, &group, AutoOffsetReset::Earliest)?;

        let metadata = consumer
            .fetch_metadata(Some(&request.topic), Timeout::After(timeout))
            .map_err(|e| kafka_error("fetching topic metadata", timeout, e))?;

        let topic_metadata = metadata
            .topics()
            .iter()
            .find(|t| t.name() == request.topic)
            .ok_or_else(|| BrowseError::Upstream(format!("Topic {} wasn't found", request.topic)))?;

        if let Some(error) = topic_metadata.error() {
            return Err(BrowseError::Upstream(format!(
                "Topic {} metadata error: {:?}",
                request.topic, error
            )));
        }

        let mut tpl = TopicPartitionList::new();
        let mut partitions = Vec::with_capacity(topic_metadata.partitions().len());
        let mut windows = HashMap::new();
        let mut pending = VecDeque::new();

        for partition in topic_metadata.partitions() {
            let id = partition.id();
            let (low, high) = consumer
                .fetch_watermarks(&request.topic, id, Timeout::After(timeout))
                .map_err(|e| kafka_error("fetching watermarks", timeout, e))?;

            let window = PartitionWindow::new(request.start_from, request.count, low, high);
            trace!(
                "Partition {}: low {}, high {}, starting at {}",
                id,
                low,
                high,
                window.start
            );

            tpl.add_partition_offset(&request.topic, id, Offset::Offset(window.start))?;
            if window.is_empty() {
                pending.push_back(SubscriptionEvent::PartitionDrained(id));
            }
            partitions.push(id);
            windows.insert(id, window);
        }

        consumer.assign(&tpl)?;
        debug!(
            "Assigned {} partitions of {} to group {}",
            partitions.len(),
            request.topic,
            group
        );

        Ok(Self {
            consumer,
            partitions,
            windows,
            pending,
        })
    }
}

/// Offsets a subscription reads from one partition: `start` up to the high watermark seen
/// when subscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PartitionWindow {
    start: i64,
    high: i64,
}

impl PartitionWindow {
    fn new(start_from: StartFrom, count: usize, low: i64, high: i64) -> Self {
        let start = match start_from {
            StartFrom::Beginning => low,
            StartFrom::Tail => {
                let count = i64::try_from(count).unwrap_or(i64::MAX);
                high.saturating_sub(count).max(low)
            }
        };

        Self { start, high }
    }

    fn is_empty(&self) -> bool {
        self.start >= self.high
    }

    /// Whether `offset` is the last message present when the window was taken.
    fn ends_at(&self, offset: i64) -> bool {
        offset.saturating_add(1) >= self.high
    }
}

#[async_trait]
impl Subscription for KafkaSubscription {
    fn partitions(&self) -> &[i32] {
        &self.partitions
    }

    async fn next_event(&mut self) -> BrowseResult<SubscriptionEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(event);
        }

        match self.consumer.recv().await {
            Ok(message) => {
                let converted = TopicMessage::from(&message);
                let partition = message.partition();
                let reached_end = self
                    .windows
                    .get(&partition)
                    .is_some_and(|window| window.ends_at(message.offset()));

                if reached_end {
                    self.pending
                        .push_back(SubscriptionEvent::PartitionDrained(partition));
                }

                Ok(SubscriptionEvent::Message(converted))
            }
            Err(KafkaError::PartitionEOF(partition)) => {
                Ok(SubscriptionEvent::PartitionDrained(partition))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for KafkaSubscription {
    fn drop(&mut self) {
        self.consumer.unassign().ok();
        debug!("Released subscription on {} partitions", self.partitions.len());
    }
}

async fn run_blocking<T, F>(f: F) -> BrowseResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> BrowseResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BrowseError::Upstream(format!("While joining blocking handle: {e}")))?
}

fn kafka_error(operation: &'static str, timeout: Duration, error: KafkaError) -> BrowseError {
    match error.rdkafka_error_code() {
        Some(RDKafkaErrorCode::OperationTimedOut) => BrowseError::timeout(operation, timeout),
        _ => BrowseError::upstream(error),
    }
}
