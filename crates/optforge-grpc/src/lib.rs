pub mod client_api;
pub mod grpc;
pub mod local_server;

pub use client_api::{CompilerClient, ObservationSpaceSpec, ObservationView};
pub use grpc::{ConversionError, GrpcError, RuntimeCompilerService};

pub use optforge_proto::common::v1 as common;
pub use optforge_proto::service::v1 as proto;
