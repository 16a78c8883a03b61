use crate::api::proto::{ConnectionStateDto, GetConnectionStatusResponse};
use kaflook::connection::ConnectionState;

pub fn connection_state_to_proto_response(state: ConnectionState) -> GetConnectionStatusResponse {
    let (dto, failure_reason) = match state {
        ConnectionState::Disconnected => (ConnectionStateDto::Disconnected, None),
        ConnectionState::Connecting => (ConnectionStateDto::Connecting, None),
        ConnectionState::Connected => (ConnectionStateDto::Connected, None),
        ConnectionState::Failed(e) => (ConnectionStateDto::Failed, Some(e.to_string())),
    };

    GetConnectionStatusResponse {
        state: dto.into(),
        is_connected: dto == ConnectionStateDto::Connected,
        failure_reason,
    }
}
