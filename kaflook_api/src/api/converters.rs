mod get_connection_status;
mod get_messages;
mod get_topics;
mod list_environments;

pub use get_connection_status::*;
pub use get_messages::*;
pub use get_topics::*;
pub use list_environments::*;
