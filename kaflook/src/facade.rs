use crate::backend::BrokerBackend;
use crate::connection::{BrokerConnection, ConnectionState};
use crate::connection_settings::ConnectionSettings;
use crate::error::{BrowseError, BrowseResult};
use crate::queries::fetch_messages::{FetchMessagesQuery, MessageTailer, TopicMessage};
use crate::queries::list_topics::{Environment, Topic, TopicCatalog};
use std::future::Future;
use std::sync::Arc;
use tokio::select;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The three reads behind the dashboard panels.
///
/// Each read is reported on its own: a failing read never touches the others. Topic and
/// message reads that find the connection down reconnect once before giving up.
pub struct BrowserFacade<B: BrokerBackend> {
    connection: Arc<BrokerConnection<B>>,
    catalog: TopicCatalog<B>,
    tailer: MessageTailer<B>,
    initial_connect: OnceCell<()>,
}

/// Outcome of refreshing every panel at once.
#[derive(Debug)]
pub struct DashboardSnapshot {
    pub status: ConnectionState,
    pub topics: BrowseResult<Vec<Topic>>,
    pub messages: Option<BrowseResult<Vec<TopicMessage>>>,
}

impl<B: BrokerBackend> BrowserFacade<B> {
    pub fn new(backend: B, settings: ConnectionSettings) -> Self {
        let connection = Arc::new(BrokerConnection::new(backend, settings));

        Self {
            catalog: TopicCatalog::new(connection.clone()),
            tailer: MessageTailer::new(connection.clone()),
            connection,
            initial_connect: OnceCell::new(),
        }
    }

    pub fn with_known_environments(mut self, environments: Vec<Environment>) -> Self {
        self.catalog = self.catalog.with_known_environments(environments);
        self
    }

    pub fn with_internal_topics(mut self, include_internal: bool) -> Self {
        self.catalog = self.catalog.with_internal_topics(include_internal);
        self
    }

    pub fn connection(&self) -> &BrokerConnection<B> {
        &self.connection
    }

    /// Only the first call in the facade's lifetime connects, later calls just read the state.
    pub async fn get_connection_status(&self) -> ConnectionState {
        self.initial_connect
            .get_or_init(|| async {
                if let Err(e) = self.connection.connect().await {
                    warn!("Initial connect failed: {}", e);
                }
            })
            .await;

        self.connection.status()
    }

    pub async fn get_topics(&self, environment: &str) -> BrowseResult<Vec<Topic>> {
        let environment = Environment::new(environment)?;

        self.with_reconnect("listing topics", || self.catalog.list_topics(&environment))
            .await
    }

    pub async fn get_messages(
        &self,
        topic: &str,
        count: usize,
        cancellation_token: CancellationToken,
    ) -> BrowseResult<Vec<TopicMessage>> {
        self.get_messages_for(FetchMessagesQuery::new(topic, count), cancellation_token)
            .await
    }

    /// `query.topic` may be a name from [`Self::get_topics`] or a broker topic name.
    pub async fn get_messages_for(
        &self,
        query: FetchMessagesQuery,
        cancellation_token: CancellationToken,
    ) -> BrowseResult<Vec<TopicMessage>> {
        query.validate()?;
        let query = &query;
        let cancellation_token = &cancellation_token;

        self.with_reconnect("fetching messages", || async move {
            let topic = select! {
                resolved = self.catalog.resolve(&query.topic) => resolved?,
                _ = cancellation_token.cancelled() => return Err(BrowseError::Cancelled),
            };
            let query = FetchMessagesQuery {
                topic,
                ..query.clone()
            };

            self.tailer
                .fetch_latest(&query, cancellation_token.clone())
                .await
        })
        .await
    }

    /// Runs the three reads concurrently, like the dashboard's refresh button.
    pub async fn refresh_all(
        &self,
        environment: &str,
        topic: Option<&str>,
        count: usize,
        cancellation_token: CancellationToken,
    ) -> DashboardSnapshot {
        let messages = async {
            match topic {
                Some(topic) => Some(
                    self.get_messages(topic, count, cancellation_token.clone())
                        .await,
                ),
                None => None,
            }
        };

        let (status, topics, messages) = tokio::join!(
            self.get_connection_status(),
            self.get_topics(environment),
            messages
        );

        DashboardSnapshot {
            status,
            topics,
            messages,
        }
    }

    async fn with_reconnect<T, F, Fut>(&self, operation: &'static str, call: F) -> BrowseResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = BrowseResult<T>>,
    {
        match call().await {
            Err(e) if e.is_not_connected() => {
                info!("Not connected while {}, reconnecting once", operation);
                match self.connection.connect().await {
                    Ok(_) => call().await,
                    Err(e @ BrowseError::Configuration(_)) => Err(e),
                    Err(e) => {
                        warn!("Reconnect while {} failed: {}", operation, e);
                        Err(BrowseError::NotConnected)
                    }
                }
            }
            other => other,
        }
    }
}
