pub mod fetch_messages;
pub mod list_topics;
