mod auto_offset_reset;
mod security_protocol;

pub use auto_offset_reset::*;
pub use security_protocol::*;
