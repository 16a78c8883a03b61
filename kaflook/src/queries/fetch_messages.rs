mod handler;
mod models;
mod request;

pub use handler::*;
pub use models::*;
pub use request::*;
