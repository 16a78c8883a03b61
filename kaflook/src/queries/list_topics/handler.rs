use crate::backend::{BrokerBackend, BrokerClient};
use crate::connection::BrokerConnection;
use crate::error::{BrowseError, BrowseResult};
use crate::queries::list_topics::{broker_name_for, Environment, Topic};
use std::sync::Arc;
use tracing::debug;

const INTERNAL_TOPIC_PREFIX: &str = "__";

/// Lists the topics of one environment. Every call asks the cluster, nothing is cached.
pub struct TopicCatalog<B: BrokerBackend> {
    connection: Arc<BrokerConnection<B>>,
    known_environments: Vec<Environment>,
    include_internal: bool,
}

impl<B: BrokerBackend> TopicCatalog<B> {
    pub fn new(connection: Arc<BrokerConnection<B>>) -> Self {
        Self {
            connection,
            known_environments: vec![],
            include_internal: false,
        }
    }

    /// Topics prefixed with another of these environments are left out of a listing.
    pub fn with_known_environments(mut self, environments: Vec<Environment>) -> Self {
        self.known_environments = environments;
        self
    }

    pub fn with_internal_topics(mut self, include_internal: bool) -> Self {
        self.include_internal = include_internal;
        self
    }

    /// Empty result is a valid answer, not an error.
    #[tracing::instrument(skip_all, fields(environment = %environment))]
    pub async fn list_topics(&self, environment: &Environment) -> BrowseResult<Vec<Topic>> {
        let names = self.broker_topic_names().await?;
        let reported = names.len();

        let topics = names
            .iter()
            .filter(|name| self.include_internal || !name.starts_with(INTERNAL_TOPIC_PREFIX))
            .filter(|name| !self.owned_by_other(environment, name))
            .map(|name| Topic::qualify(environment, name))
            .collect::<Vec<_>>();

        debug!(
            "Cluster reported {} topics, {} belong to {}",
            reported,
            topics.len(),
            environment
        );

        Ok(topics)
    }

    /// Broker name of a topic as [`Self::list_topics`] reported it.
    pub async fn resolve(&self, listed_name: &str) -> BrowseResult<String> {
        let names = self.broker_topic_names().await?;
        let resolved = broker_name_for(listed_name, &names);
        if resolved != listed_name {
            debug!("Topic {} resolved to {}", listed_name, resolved);
        }

        Ok(resolved.to_owned())
    }

    async fn broker_topic_names(&self) -> BrowseResult<Vec<String>> {
        let client = self.connection.client()?;
        let timeout = self.connection.settings().timeouts.list_topics();

        tokio::time::timeout(timeout, client.list_topic_names(timeout))
            .await
            .map_err(|_| BrowseError::timeout("listing topics", timeout))?
    }

    fn owned_by_other(&self, environment: &Environment, name: &str) -> bool {
        self.known_environments
            .iter()
            .any(|known| known != environment && known.owns(name))
    }
}
