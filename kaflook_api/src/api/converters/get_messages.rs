use crate::api::proto::{
    GetMessagesRequest, GetMessagesResponse, KafkaMessageDto, MessageFormatDto, StartFromDto,
};
use crate::time_util::ProtoTimestampConvert;
use anyhow::{bail, Context};
use kaflook::format::{bytes_to_string, Format};
use kaflook::queries::fetch_messages::{FetchMessagesQuery, StartFrom, TopicMessage};

/// Server-side limits applied to every message request.
#[derive(Debug, Clone, Copy)]
pub struct MessageLimits {
    pub default_count: u32,
    pub max_count: u32,
    pub default_format: Format,
}

#[derive(Debug)]
pub struct GetMessagesQuery {
    pub query: FetchMessagesQuery,
    pub format: Format,
}

pub fn proto_get_messages_to_internal(
    model: GetMessagesRequest,
    limits: &MessageLimits,
) -> Result<GetMessagesQuery, anyhow::Error> {
    let count = match model.count {
        0 => limits.default_count,
        count if count > limits.max_count => {
            bail!("Count {} exceeds the maximum of {}", count, limits.max_count)
        }
        count => count,
    };

    let format = MessageFormatDto::try_from(model.format)
        .context("While parsing message format")?;
    let format = match format {
        MessageFormatDto::Unspecified => limits.default_format,
        MessageFormatDto::String => Format::String,
        MessageFormatDto::Hex => Format::Hex,
        MessageFormatDto::Base64 => Format::Base64,
        MessageFormatDto::PrettyJson => Format::PrettyJson,
    };

    let start_from = StartFromDto::try_from(model.start_from)
        .context("While parsing start from")?;
    let start_from = match start_from {
        StartFromDto::Unspecified | StartFromDto::Beginning => StartFrom::Beginning,
        StartFromDto::Tail => StartFrom::Tail,
    };

    let query = FetchMessagesQuery::new(model.topic, count as usize).with_start_from(start_from);

    Ok(GetMessagesQuery { query, format })
}

pub fn messages_to_proto_response(messages: Vec<TopicMessage>, format: Format) -> GetMessagesResponse {
    let messages = messages
        .into_iter()
        .map(|message| KafkaMessageDto {
            partition: message.partition_offset.partition(),
            offset: message.partition_offset.offset(),
            timestamp: message.timestamp.map(|t| t.to_proto_timestamp()),
            key: message.key.as_deref().map(|k| bytes_to_string(k, Format::String)),
            content: message.payload.as_deref().map(|p| bytes_to_string(p, format)),
            headers: message.headers.unwrap_or_default(),
        })
        .collect();

    GetMessagesResponse { messages }
}
