use crate::consumer::PartitionOffset;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rdkafka::message::{BorrowedMessage, Headers};
use rdkafka::Message;
use std::collections::HashMap;

/// Where a tail starts reading inside each partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartFrom {
    /// Earliest retained offset.
    #[default]
    Beginning,
    /// `count` messages before the high watermark, so the newest messages come back.
    Tail,
}

/// Snapshot of a message taken at fetch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMessage {
    pub partition_offset: PartitionOffset,
    pub timestamp: Option<DateTime<Utc>>,
    pub key: Option<Bytes>,
    pub payload: Option<Bytes>,
    pub headers: Option<HashMap<String, String>>,
}

impl TopicMessage {
    pub fn new(partition: i32, offset: i64, payload: impl Into<Bytes>) -> Self {
        Self {
            partition_offset: PartitionOffset::new(partition, offset),
            timestamp: None,
            key: None,
            payload: Some(payload.into()),
            headers: None,
        }
    }
}

impl From<&BorrowedMessage<'_>> for TopicMessage {
    fn from(message: &BorrowedMessage<'_>) -> Self {
        let timestamp = message
            .timestamp()
            .to_millis()
            .and_then(DateTime::from_timestamp_millis);

        let headers = message.headers().map(|h| {
            h.iter()
                .map(|header| {
                    (
                        header.key.to_owned(),
                        header
                            .value
                            .map_or_else(String::new, |v| String::from_utf8_lossy(v).to_string()),
                    )
                })
                .collect::<HashMap<_, _>>()
        });

        Self {
            partition_offset: PartitionOffset::new(message.partition(), message.offset()),
            timestamp,
            key: message.key().map(Bytes::copy_from_slice),
            payload: message.payload().map(Bytes::copy_from_slice),
            headers,
        }
    }
}
