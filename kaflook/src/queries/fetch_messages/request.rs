use crate::error::{BrowseError, BrowseResult};
use crate::queries::fetch_messages::StartFrom;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMessagesQuery {
    pub topic: String,
    pub count: usize,
    pub start_from: StartFrom,
}

impl FetchMessagesQuery {
    pub fn new(topic: impl Into<String>, count: usize) -> Self {
        Self {
            topic: topic.into(),
            count,
            start_from: StartFrom::default(),
        }
    }

    pub fn with_start_from(mut self, start_from: StartFrom) -> Self {
        self.start_from = start_from;
        self
    }

    pub fn validate(&self) -> BrowseResult<()> {
        if self.topic.trim().is_empty() {
            return Err(BrowseError::Configuration(
                "Topic can't be empty".to_owned(),
            ));
        }
        if self.count == 0 {
            return Err(BrowseError::Configuration(
                "Message count must be positive".to_owned(),
            ));
        }

        Ok(())
    }
}
