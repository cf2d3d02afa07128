use optforge_core::SessionError;
use optforge_core::value::ShapeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrpcError {
    #[error("Failed to connect to gRPC server: {0}")]
    ConnectionFailed(#[from] tonic::transport::Error),

    #[error("gRPC call failed: {0}")]
    CallFailed(#[from] Box<tonic::Status>),

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: i64 },

    #[error("No space with index {index} in the service catalog")]
    UnknownSpaceIndex { index: i32 },

    #[error("Unknown benchmark: {uri}")]
    UnknownBenchmark { uri: String },

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

/// Failures translating between wire messages and host values. These are
/// always surfaced to the caller, never downgraded to defaults.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Missing oneof variant in {message}")]
    MissingOneofVariant { message: String },

    #[error("Invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },

    #[error("Tensor shape mismatch: {0}")]
    Shape(#[from] ShapeError),

    #[error("No decoder registered for opaque format '{format}'")]
    UnknownOpaqueFormat { format: String },

    #[error("Invalid data: {message}")]
    InvalidData { message: String },
}

impl From<GrpcError> for tonic::Status {
    fn from(err: GrpcError) -> Self {
        match err {
            GrpcError::ConnectionFailed(e) => {
                tonic::Status::unavailable(format!("Connection failed: {e}"))
            }
            GrpcError::CallFailed(status) => *status,
            GrpcError::SessionNotFound { session_id } => {
                tonic::Status::not_found(format!("Session not found: {session_id}"))
            }
            GrpcError::UnknownSpaceIndex { index } => {
                tonic::Status::invalid_argument(format!("No space with index {index}"))
            }
            GrpcError::UnknownBenchmark { uri } => {
                tonic::Status::not_found(format!("Unknown benchmark: {uri}"))
            }
            GrpcError::Conversion(e) => {
                tonic::Status::invalid_argument(format!("Conversion error: {e}"))
            }
            GrpcError::Session(e) => session_error_to_status(&e),
            GrpcError::ChannelError(msg) => tonic::Status::internal(format!("Channel error: {msg}")),
        }
    }
}

fn session_error_to_status(err: &SessionError) -> tonic::Status {
    match err {
        SessionError::OutOfRangeAction { .. } | SessionError::MalformedAction(_) => {
            tonic::Status::invalid_argument(err.to_string())
        }
        SessionError::SessionClosed | SessionError::SetupFailure(_) => {
            tonic::Status::failed_precondition(err.to_string())
        }
        SessionError::ForkUnsupported => tonic::Status::unimplemented(err.to_string()),
        SessionError::UnknownObservationSpace(_) => tonic::Status::not_found(err.to_string()),
        SessionError::UnknownParameter(_) => tonic::Status::invalid_argument(err.to_string()),
        SessionError::ExternalTool(_) | SessionError::Io(_) => {
            tonic::Status::internal(err.to_string())
        }
    }
}
