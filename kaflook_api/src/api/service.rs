use crate::api::converters::{
    connection_state_to_proto_response, environments_to_proto_response,
    messages_to_proto_response, proto_get_messages_to_internal, topics_to_proto_response,
    MessageLimits,
};
use crate::api::proto;
use crate::app_config::EnvironmentConfig;
use crate::error::ApplicationError;
use kaflook::backend::BrokerBackend;
use kaflook::facade::BrowserFacade;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::debug;

pub struct KaflookService<B: BrokerBackend> {
    facade: Arc<BrowserFacade<B>>,
    environments: Vec<EnvironmentConfig>,
    limits: MessageLimits,
}

impl<B: BrokerBackend> KaflookService<B> {
    pub fn new(
        facade: Arc<BrowserFacade<B>>,
        environments: Vec<EnvironmentConfig>,
        limits: MessageLimits,
    ) -> Self {
        Self {
            facade,
            environments,
            limits,
        }
    }
}

#[tonic::async_trait]
impl<B: BrokerBackend> proto::kaflook_server::Kaflook for KaflookService<B> {
    async fn get_connection_status(
        &self,
        _request: Request<proto::GetConnectionStatusRequest>,
    ) -> Result<Response<proto::GetConnectionStatusResponse>, Status> {
        let state = self.facade.get_connection_status().await;
        debug!("Connection state: {:?}", state);

        Ok(Response::new(connection_state_to_proto_response(state)))
    }

    async fn list_environments(
        &self,
        _request: Request<proto::ListEnvironmentsRequest>,
    ) -> Result<Response<proto::ListEnvironmentsResponse>, Status> {
        Ok(Response::new(environments_to_proto_response(
            &self.environments,
        )))
    }

    async fn get_topics(
        &self,
        request: Request<proto::GetTopicsRequest>,
    ) -> Result<Response<proto::GetTopicsResponse>, Status> {
        debug!("New request: {:?}", request);
        let request = request.into_inner();

        let topics = self
            .facade
            .get_topics(&request.environment)
            .await
            .map_err(ApplicationError::from)?;

        Ok(Response::new(topics_to_proto_response(topics)))
    }

    async fn get_messages(
        &self,
        request: Request<proto::GetMessagesRequest>,
    ) -> Result<Response<proto::GetMessagesResponse>, Status> {
        debug!("New request: {:?}", request);

        let query = proto_get_messages_to_internal(request.into_inner(), &self.limits)
            .map_err(ApplicationError::InvalidArgument)?;
        debug!("Mapped request: {:?}", query);

        // a client that goes away drops this future and the guard with it
        let cancellation_token = CancellationToken::new();
        let _guard = cancellation_token.clone().drop_guard();

        let messages = self
            .facade
            .get_messages_for(query.query, cancellation_token)
            .await
            .map_err(ApplicationError::from)?;

        Ok(Response::new(messages_to_proto_response(
            messages,
            query.format,
        )))
    }
}
