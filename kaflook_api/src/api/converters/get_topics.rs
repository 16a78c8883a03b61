use crate::api::proto::{GetTopicsResponse, TopicDto};
use kaflook::queries::list_topics::Topic;

pub fn topics_to_proto_response(topics: Vec<Topic>) -> GetTopicsResponse {
    let topics = topics
        .into_iter()
        .map(|topic| TopicDto {
            name: topic.name().clone(),
        })
        .collect();

    GetTopicsResponse { topics }
}
