use crate::connection_settings::ConnectionSettings;
use crate::error::BrowseError;
use rdkafka::admin::AdminClient;
use rdkafka::client::DefaultClientContext;
use rdkafka::ClientConfig;
use std::ops::Deref;

/// The shared administrative handle behind a [`crate::connection::BrokerConnection`].
pub struct AdminWrapper {
    client: AdminClient<DefaultClientContext>,
}

impl AdminWrapper {
    pub fn create(connection_settings: &ConnectionSettings) -> Result<Self, BrowseError> {
        // https://raw.githubusercontent.com/confluentinc/librdkafka/master/CONFIGURATION.md
        let client: AdminClient<DefaultClientContext> =
            ClientConfig::try_from(connection_settings)?
                .set("receive.message.max.bytes", "2147483647")
                .create()?;

        Ok(Self { client })
    }
}

impl Deref for AdminWrapper {
    type Target = AdminClient<DefaultClientContext>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}
