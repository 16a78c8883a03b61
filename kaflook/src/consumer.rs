mod consumer_settings;
mod consumer_wrapper;
mod partition_offset;

pub use consumer_settings::*;
pub use consumer_wrapper::*;
pub use partition_offset::*;
