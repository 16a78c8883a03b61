use crate::backend::{BrokerBackend, BrokerClient, Subscription, SubscriptionEvent, SubscriptionRequest};
use crate::connection::BrokerConnection;
use crate::error::{BrowseError, BrowseResult};
use crate::queries::fetch_messages::{FetchMessagesQuery, TopicMessage};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reads at most `count` messages of one topic and stops.
pub struct MessageTailer<B: BrokerBackend> {
    connection: Arc<BrokerConnection<B>>,
}

impl<B: BrokerBackend> MessageTailer<B> {
    pub fn new(connection: Arc<BrokerConnection<B>>) -> Self {
        Self { connection }
    }

    /// Opens a dedicated subscription and drains it.
    ///
    /// Returns once `count` messages are collected, every partition is drained, or the drain
    /// window elapses. In the last case whatever was collected is returned, and a
    /// [`BrowseError::Timeout`] only when nothing arrived at all. The subscription is dropped
    /// on every path, including cancellation through `cancellation_token`.
    #[tracing::instrument(skip_all, fields(topic = %query.topic, count = query.count))]
    pub async fn fetch_latest(
        &self,
        query: &FetchMessagesQuery,
        cancellation_token: CancellationToken,
    ) -> BrowseResult<Vec<TopicMessage>> {
        query.validate()?;
        let client = self.connection.client()?;
        let timeouts = self.connection.settings().timeouts;

        let request = SubscriptionRequest {
            topic: query.topic.clone(),
            start_from: query.start_from,
            count: query.count,
            timeout: timeouts.subscribe(),
        };

        let subscription = select! {
            opened = tokio::time::timeout(timeouts.subscribe(), client.open_subscription(&request)) => {
                opened.map_err(|_| BrowseError::timeout("subscribing", timeouts.subscribe()))??
            }
            _ = cancellation_token.cancelled() => {
                info!("Tail was cancelled while subscribing");
                return Err(BrowseError::Cancelled);
            }
        };

        let messages = drain(subscription, query.count, timeouts.drain(), &cancellation_token).await?;
        debug!("Collected {} messages", messages.len());

        Ok(messages)
    }
}

async fn drain(
    mut subscription: Box<dyn Subscription>,
    count: usize,
    window: Duration,
    cancellation_token: &CancellationToken,
) -> BrowseResult<Vec<TopicMessage>> {
    let partitions = subscription
        .partitions()
        .iter()
        .copied()
        .collect::<HashSet<_>>();
    let mut drained = HashSet::with_capacity(partitions.len());
    let mut messages = Vec::with_capacity(count.min(1024));
    let deadline = Instant::now() + window;

    while messages.len() < count && drained.len() < partitions.len() {
        let event = select! {
            event = tokio::time::timeout_at(deadline, subscription.next_event()) => event,
            _ = cancellation_token.cancelled() => {
                info!("Tail was cancelled after {} messages", messages.len());
                return Err(BrowseError::Cancelled);
            }
        };

        match event {
            Ok(Ok(SubscriptionEvent::Message(message))) => messages.push(message),
            Ok(Ok(SubscriptionEvent::PartitionDrained(partition))) => {
                if partitions.contains(&partition) {
                    drained.insert(partition);
                }
            }
            Ok(Err(e)) => return Err(e),
            Err(_) if messages.is_empty() => {
                return Err(BrowseError::timeout("draining messages", window));
            }
            Err(_) => {
                warn!(
                    "Drain window elapsed, returning {} of {} messages",
                    messages.len(),
                    count
                );
                break;
            }
        }
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SimulatedBackend, SimulatedTopic};
    use crate::connection_settings::{BrowseTimeouts, ConnectionSettings};
    use crate::queries::fetch_messages::StartFrom;
    use bytes::Bytes;
    use std::collections::HashMap;

    const DRAIN_WINDOW: Duration = Duration::from_secs(3);

    async fn tailer(backend: &SimulatedBackend) -> MessageTailer<SimulatedBackend> {
        let mut settings = ConnectionSettings::new(vec!["localhost:9092".to_owned()]);
        settings.timeouts = BrowseTimeouts::new(
            Duration::from_secs(5),
            Duration::from_secs(5),
            Duration::from_secs(5),
            DRAIN_WINDOW,
        );
        let connection = Arc::new(BrokerConnection::new(backend.clone(), settings));
        connection.connect().await.unwrap();
        MessageTailer::new(connection)
    }

    fn payloads(messages: &[TopicMessage]) -> Vec<&[u8]> {
        messages
            .iter()
            .map(|m| m.payload.as_deref().unwrap_or_default())
            .collect()
    }

    fn orders(count: usize) -> SimulatedTopic {
        SimulatedTopic::single_partition(
            "dev.orders",
            (0..count).map(|i| Bytes::from(format!("order-{i}"))),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn never_returns_more_than_count() {
        let backend = SimulatedBackend::new().with_topic(SimulatedTopic::new(
            "dev.orders",
            vec![
                vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")],
                vec![Bytes::from("d"), Bytes::from("e")],
                vec![Bytes::from("f"), Bytes::from("g")],
            ],
        ));
        let tailer = tailer(&backend).await;

        for count in 1..=10 {
            let messages = tailer
                .fetch_latest(&FetchMessagesQuery::new("dev.orders", count), CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(messages.len(), count.min(7), "count {count}");
        }
        assert_eq!(backend.live_subscriptions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fewer_messages_than_count_returns_without_waiting_for_window() {
        let backend = SimulatedBackend::new().with_topic(orders(3));
        let tailer = tailer(&backend).await;
        let started = Instant::now();

        let messages = tailer
            .fetch_latest(&FetchMessagesQuery::new("dev.orders", 10), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(payloads(&messages), vec![&b"order-0"[..], b"order-1", b"order-2"]);
        assert!(started.elapsed() < DRAIN_WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_topic_is_empty_batch() {
        let backend = SimulatedBackend::new().with_topic(SimulatedTopic::empty("dev.orders"));
        let tailer = tailer(&backend).await;

        let messages = tailer
            .fetch_latest(&FetchMessagesQuery::new("dev.orders", 10), CancellationToken::new())
            .await
            .unwrap();

        assert!(messages.is_empty());
        assert_eq!(backend.live_subscriptions(), 0);
    }

    #[tokio::test]
    async fn zero_count_is_configuration_error() {
        let backend = SimulatedBackend::new().with_topic(orders(3));
        let tailer = tailer(&backend).await;

        let result = tailer
            .fetch_latest(&FetchMessagesQuery::new("dev.orders", 0), CancellationToken::new())
            .await;

        assert!(matches!(result, Err(BrowseError::Configuration(_))));
        assert_eq!(backend.opened_subscriptions(), 0);
    }

    #[tokio::test]
    async fn requires_connection() {
        let backend = SimulatedBackend::new().with_topic(orders(3));
        let connection = Arc::new(BrokerConnection::new(
            backend.clone(),
            ConnectionSettings::new(vec!["localhost:9092".to_owned()]),
        ));
        let tailer = MessageTailer::new(connection);

        let result = tailer
            .fetch_latest(&FetchMessagesQuery::new("dev.orders", 5), CancellationToken::new())
            .await;

        assert_eq!(result, Err(BrowseError::NotConnected));
        assert_eq!(backend.dial_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn open_tail_returns_partial_batch_when_window_elapses() {
        let backend = SimulatedBackend::new()
            .with_topic(orders(2))
            .without_drain_signal();
        let tailer = tailer(&backend).await;
        let started = Instant::now();

        let messages = tailer
            .fetch_latest(&FetchMessagesQuery::new("dev.orders", 10), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert!(started.elapsed() >= DRAIN_WINDOW);
        assert_eq!(backend.live_subscriptions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_tail_times_out() {
        let backend = SimulatedBackend::new()
            .with_topic(SimulatedTopic::empty("dev.orders"))
            .without_drain_signal();
        let tailer = tailer(&backend).await;

        let result = tailer
            .fetch_latest(&FetchMessagesQuery::new("dev.orders", 10), CancellationToken::new())
            .await;

        assert_eq!(
            result,
            Err(BrowseError::timeout("draining messages", DRAIN_WINDOW))
        );
        assert_eq!(backend.live_subscriptions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_releases_subscription() {
        let backend = SimulatedBackend::new()
            .with_topic(SimulatedTopic::empty("dev.orders"))
            .without_drain_signal();
        let tailer = tailer(&backend).await;
        let token = CancellationToken::new();
        let query = FetchMessagesQuery::new("dev.orders", 10);

        let (result, live_before_cancel) = tokio::join!(
            tailer.fetch_latest(&query, token.clone()),
            async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                let live = backend.live_subscriptions();
                token.cancel();
                live
            }
        );

        assert_eq!(live_before_cancel, 1);
        assert_eq!(result, Err(BrowseError::Cancelled));
        assert_eq!(backend.live_subscriptions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_fetch_releases_subscription() {
        let backend = SimulatedBackend::new()
            .with_topic(SimulatedTopic::empty("dev.orders"))
            .without_drain_signal();
        let tailer = tailer(&backend).await;

        let query = FetchMessagesQuery::new("dev.orders", 10);
        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            tailer.fetch_latest(&query, CancellationToken::new()),
        )
        .await;

        assert!(abandoned.is_err());
        assert_eq!(backend.opened_subscriptions(), 1);
        assert_eq!(backend.live_subscriptions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn each_call_uses_its_own_subscription() {
        let backend = SimulatedBackend::new().with_topic(orders(5));
        let tailer = tailer(&backend).await;
        let query = FetchMessagesQuery::new("dev.orders", 2);

        let first = tailer.fetch_latest(&query, CancellationToken::new()).await.unwrap();
        let second = tailer.fetch_latest(&query, CancellationToken::new()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.opened_subscriptions(), 2);
        assert_eq!(backend.live_subscriptions(), 0);
        assert_eq!(backend.dial_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_offset_order_within_partitions() {
        let partitions = (0..3)
            .map(|p| (0..4).map(|i| Bytes::from(format!("{p}-{i}"))).collect())
            .collect();
        let backend =
            SimulatedBackend::new().with_topic(SimulatedTopic::new("dev.orders", partitions));
        let tailer = tailer(&backend).await;

        let messages = tailer
            .fetch_latest(&FetchMessagesQuery::new("dev.orders", 12), CancellationToken::new())
            .await
            .unwrap();

        let mut last_offsets = HashMap::new();
        for message in &messages {
            let position = message.partition_offset;
            if let Some(previous) = last_offsets.insert(position.partition(), position.offset()) {
                assert!(previous < position.offset());
            }
        }
        assert_eq!(messages.len(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn tail_returns_newest_messages() {
        let backend = SimulatedBackend::new().with_topic(orders(6));
        let tailer = tailer(&backend).await;
        let query = FetchMessagesQuery::new("dev.orders", 2).with_start_from(StartFrom::Tail);

        let messages = tailer.fetch_latest(&query, CancellationToken::new()).await.unwrap();

        assert_eq!(payloads(&messages), vec![&b"order-4"[..], b"order-5"]);
    }

    #[tokio::test]
    async fn unknown_topic_is_surfaced_verbatim() {
        let backend = SimulatedBackend::new();
        let tailer = tailer(&backend).await;

        let result = tailer
            .fetch_latest(&FetchMessagesQuery::new("dev.missing", 5), CancellationToken::new())
            .await;

        assert_eq!(
            result,
            Err(BrowseError::Upstream("Topic dev.missing wasn't found".to_owned()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_subscribe_times_out() {
        let backend = SimulatedBackend::new().with_topic(orders(1));
        let tailer = tailer(&backend).await;
        backend.set_latency(Duration::from_secs(60));

        let result = tailer
            .fetch_latest(&FetchMessagesQuery::new("dev.orders", 1), CancellationToken::new())
            .await;

        assert_eq!(
            result,
            Err(BrowseError::timeout("subscribing", Duration::from_secs(5)))
        );
    }
}
