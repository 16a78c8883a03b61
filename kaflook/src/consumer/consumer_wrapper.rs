use crate::connection_settings::ConnectionSettings;
use crate::consumer::AutoOffsetReset;
use crate::error::BrowseError;
use rdkafka::consumer::StreamConsumer;
use rdkafka::ClientConfig;
use std::ops::Deref;

/// Consumer owned by a single tail. Dropping it leaves the group and closes its sockets.
pub struct ConsumerWrapper {
    consumer: StreamConsumer,
}

impl ConsumerWrapper {
    pub fn create_for_browsing(
        connection_settings: &ConnectionSettings,
        group: &str,
        auto_offset_reset: AutoOffsetReset,
    ) -> Result<Self, BrowseError> {
        // https://raw.githubusercontent.com/confluentinc/librdkafka/master/CONFIGURATION.md
        let consumer: StreamConsumer = ClientConfig::try_from(connection_settings)?
            .set("group.id", group)
            .set("auto.offset.reset", auto_offset_reset.to_string())
            .set("enable.partition.eof", "true")
            .set("session.timeout.ms", "10000")
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("receive.message.max.bytes", "2147483647")
            .set("heartbeat.interval.ms", "1000")
            .create()?;

        Ok(Self { consumer })
    }
}

impl Deref for ConsumerWrapper {
    type Target = StreamConsumer;

    fn deref(&self) -> &Self::Target {
        &self.consumer
    }
}
