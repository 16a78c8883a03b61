use kaflook::error::BrowseError;
use tonic::Status;
use tracing::{error, warn};

#[derive(Debug)]
pub enum ApplicationError {
    InvalidArgument(anyhow::Error),
    Browse(BrowseError),
}

impl From<BrowseError> for ApplicationError {
    fn from(value: BrowseError) -> Self {
        ApplicationError::Browse(value)
    }
}

impl From<ApplicationError> for Status {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::InvalidArgument(e) => {
                warn!("{e:?}");
                Status::invalid_argument(format!("{e}"))
            }
            ApplicationError::Browse(e) => {
                let message = e.to_string();
                match e {
                    BrowseError::Configuration(_) => Status::invalid_argument(message),
                    BrowseError::NotConnected => Status::unavailable(message),
                    BrowseError::Timeout { .. } => Status::deadline_exceeded(message),
                    BrowseError::Cancelled => Status::cancelled(message),
                    BrowseError::Upstream(_) => {
                        error!("{message}");
                        Status::internal(message)
                    }
                }
            }
        }
    }
}
