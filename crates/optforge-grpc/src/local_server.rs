//! In-process bootstrap: serve a [`RuntimeCompilerService`] on a loopback
//! port and hand back a connected channel. Used by integration tests and
//! embedders that want the full RPC surface without external wiring.

use std::path::PathBuf;
use std::sync::Arc;

use optforge_core::session::SessionFactory;
use optforge_proto::service::v1::compiler_service_server::CompilerServiceServer;
use tokio::sync::oneshot;
use tonic::transport::{Channel, Server};

use crate::grpc::RuntimeCompilerService;
use crate::grpc::error::GrpcError;

type Result<T> = std::result::Result<T, GrpcError>;

pub async fn create_local_channel(
    factory: Arc<dyn SessionFactory>,
    working_root: PathBuf,
) -> Result<(Channel, tokio::task::JoinHandle<()>)> {
    let (tx, rx) = oneshot::channel();

    let service = RuntimeCompilerService::new(factory, working_root);
    let svc = CompilerServiceServer::new(service);

    let server_handle: tokio::task::JoinHandle<()> = tokio::spawn(async move {
        let addr: std::net::SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let local_addr = listener.local_addr().unwrap();

        tx.send(local_addr).unwrap();

        Server::builder()
            .add_service(svc)
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .expect("Failed to run localhost server");
    });

    let addr = rx
        .await
        .map_err(|e| GrpcError::ChannelError(format!("Failed to receive server address: {e}")))?;

    let endpoint =
        tonic::transport::Endpoint::try_from(format!("http://{addr}"))?.tcp_nodelay(true);
    let channel = endpoint.connect().await?;

    Ok((channel, server_handle))
}
