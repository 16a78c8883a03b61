extern crate kaflook_api;

use kaflook::error::BrowseError;
use kaflook_api::error::ApplicationError;
use std::time::Duration;
use tonic::{Code, Status};

fn code(error: BrowseError) -> Code {
    Status::from(ApplicationError::from(error)).code()
}

#[test]
fn browse_errors_map_to_grpc_codes() {
    assert_eq!(
        code(BrowseError::Configuration("no brokers".to_owned())),
        Code::InvalidArgument
    );
    assert_eq!(code(BrowseError::NotConnected), Code::Unavailable);
    assert_eq!(
        code(BrowseError::timeout("listing topics", Duration::from_secs(5))),
        Code::DeadlineExceeded
    );
    assert_eq!(code(BrowseError::upstream("boom")), Code::Internal);
    assert_eq!(code(BrowseError::Cancelled), Code::Cancelled);
}

#[test]
fn invalid_argument_keeps_message() {
    let status = Status::from(ApplicationError::InvalidArgument(anyhow::anyhow!(
        "Count 1000 exceeds the maximum of 500"
    )));

    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "Count 1000 exceeds the maximum of 500");
}
