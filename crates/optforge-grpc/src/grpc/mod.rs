pub mod conversions;
pub mod error;
pub mod runtime_server;


pub use error::*;
pub use runtime_server::RuntimeCompilerService;
