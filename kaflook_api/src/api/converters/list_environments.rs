use crate::api::proto::{EnvironmentDto, ListEnvironmentsResponse};
use crate::app_config::EnvironmentConfig;

pub fn environments_to_proto_response(environments: &[EnvironmentConfig]) -> ListEnvironmentsResponse {
    let environments = environments
        .iter()
        .map(|e| EnvironmentDto {
            name: e.name.clone(),
            label: e.label.clone(),
        })
        .collect();

    ListEnvironmentsResponse { environments }
}
