mod handler;
mod models;

pub use handler::*;
pub use models::*;
