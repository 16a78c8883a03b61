pub mod converters;
mod service;

pub use service::*;

pub mod proto {
    tonic::include_proto!("kaflook_api");

    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("kaflook_service_descriptor");
}
