extern crate kaflook_api;

use bytes::Bytes;
use kaflook::backend::{SimulatedBackend, SimulatedTopic};
use kaflook::connection_settings::ConnectionSettings;
use kaflook::facade::BrowserFacade;
use kaflook::format::Format;
use kaflook::queries::list_topics::Environment;
use kaflook_api::api::converters::MessageLimits;
use kaflook_api::api::proto::kaflook_server::Kaflook;
use kaflook_api::api::proto::{
    ConnectionStateDto, GetConnectionStatusRequest, GetMessagesRequest, GetTopicsRequest,
    ListEnvironmentsRequest, MessageFormatDto, StartFromDto,
};
use kaflook_api::api::KaflookService;
use kaflook_api::app_config::EnvironmentConfig;
use std::sync::Arc;
use tonic::{Code, Request};

fn service(backend: SimulatedBackend) -> KaflookService<SimulatedBackend> {
    let facade = BrowserFacade::new(
        backend,
        ConnectionSettings::new(vec!["localhost:9092".to_owned()]),
    )
    .with_known_environments(vec![
        Environment::new("dev").unwrap(),
        Environment::new("sandbox").unwrap(),
    ]);

    KaflookService::new(
        Arc::new(facade),
        vec![
            EnvironmentConfig {
                name: "dev".to_owned(),
                label: "Development".to_owned(),
            },
            EnvironmentConfig {
                name: "sandbox".to_owned(),
                label: "Sandbox".to_owned(),
            },
        ],
        MessageLimits {
            default_count: 10,
            max_count: 100,
            default_format: Format::PrettyJson,
        },
    )
}

fn messages_request(topic: &str, count: u32) -> GetMessagesRequest {
    GetMessagesRequest {
        topic: topic.to_owned(),
        count,
        format: MessageFormatDto::Unspecified.into(),
        start_from: StartFromDto::Unspecified.into(),
    }
}

#[tokio::test]
async fn reports_connected_after_first_status_call() {
    let service = service(SimulatedBackend::new());

    let response = service
        .get_connection_status(Request::new(GetConnectionStatusRequest {}))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.state(), ConnectionStateDto::Connected);
    assert!(response.is_connected);
    assert_eq!(response.failure_reason, None);
}

#[tokio::test]
async fn reports_failure_reason_for_unreachable_cluster() {
    let backend = SimulatedBackend::new();
    backend.set_unreachable(true);
    let service = service(backend);

    let response = service
        .get_connection_status(Request::new(GetConnectionStatusRequest {}))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.state(), ConnectionStateDto::Failed);
    assert!(!response.is_connected);
    assert!(response
        .failure_reason
        .unwrap()
        .contains("Could not reach brokers localhost:9092"));
}

#[tokio::test]
async fn lists_configured_environments() {
    let service = service(SimulatedBackend::new());

    let response = service
        .list_environments(Request::new(ListEnvironmentsRequest {}))
        .await
        .unwrap()
        .into_inner();

    let names = response
        .environments
        .iter()
        .map(|e| e.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["dev", "sandbox"]);
}

#[tokio::test]
async fn lists_only_requested_environment_topics() {
    let backend = SimulatedBackend::new()
        .with_topic(SimulatedTopic::empty("dev.orders"))
        .with_topic(SimulatedTopic::empty("sandbox.test_orders"))
        .with_topic(SimulatedTopic::empty("dev.customers"));
    let service = service(backend);

    let response = service
        .get_topics(Request::new(GetTopicsRequest {
            environment: "dev".to_owned(),
        }))
        .await
        .unwrap()
        .into_inner();

    let names = response
        .topics
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["dev.orders", "dev.customers"]);
}

#[tokio::test]
async fn empty_environment_is_ok_and_empty() {
    let service = service(SimulatedBackend::new());

    let response = service
        .get_topics(Request::new(GetTopicsRequest {
            environment: "sandbox".to_owned(),
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(response.topics.is_empty());
}

#[tokio::test]
async fn unreachable_cluster_is_unavailable() {
    let backend = SimulatedBackend::new();
    backend.set_unreachable(true);
    let service = service(backend);

    let status = service
        .get_topics(Request::new(GetTopicsRequest {
            environment: "dev".to_owned(),
        }))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Unavailable);
}

#[tokio::test]
async fn renders_messages_with_default_format() {
    let backend = SimulatedBackend::new().with_topic(SimulatedTopic::single_partition(
        "dev.orders",
        [Bytes::from(r#"{"id":1}"#), Bytes::from("plain text")],
    ));
    let service = service(backend);

    let response = service
        .get_messages(Request::new(messages_request("dev.orders", 10)))
        .await
        .unwrap()
        .into_inner();

    let contents = response
        .messages
        .iter()
        .map(|m| m.content.as_deref().unwrap_or_default())
        .collect::<Vec<_>>();
    assert_eq!(contents, vec!["{\n  \"id\": 1\n}", "plain text"]);
    assert_eq!(response.messages[1].offset, 1);
}

#[tokio::test]
async fn zero_count_uses_server_default() {
    let backend = SimulatedBackend::new().with_topic(SimulatedTopic::single_partition(
        "dev.orders",
        (0..20).map(|i| Bytes::from(format!("order-{i}"))),
    ));
    let service = service(backend);

    let response = service
        .get_messages(Request::new(messages_request("dev.orders", 0)))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.messages.len(), 10);
}

#[tokio::test]
async fn tail_request_returns_newest_messages() {
    let backend = SimulatedBackend::new().with_topic(SimulatedTopic::single_partition(
        "dev.orders",
        ["a", "b", "c"],
    ));
    let service = service(backend);
    let mut request = messages_request("dev.orders", 1);
    request.start_from = StartFromDto::Tail.into();
    request.format = MessageFormatDto::String.into();

    let response = service
        .get_messages(Request::new(request))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.messages.len(), 1);
    assert_eq!(response.messages[0].content.as_deref(), Some("c"));
}

#[tokio::test]
async fn count_above_maximum_is_invalid_argument() {
    let service = service(SimulatedBackend::new());

    let status = service
        .get_messages(Request::new(messages_request("dev.orders", 1000)))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn unknown_topic_is_internal_error() {
    let service = service(SimulatedBackend::new());

    let status = service
        .get_messages(Request::new(messages_request("dev.missing", 5)))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Internal);
    assert!(status.message().contains("Topic dev.missing wasn't found"));
}
