//! gRPC server bootstrap.

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::service::ExternalScalerService;

/// Serve the external scaler on an already-bound listener until
/// `shutdown` is cancelled.
///
/// The same token should be handed to the service via
/// [`ExternalScalerService::with_shutdown`] so open streams end and the
/// graceful shutdown does not wait on them forever.
pub async fn serve(
    listener: TcpListener,
    service: ExternalScalerService,
    shutdown: CancellationToken,
) -> Result<(), tonic::transport::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "external scaler gRPC server listening");
    }

    tonic::transport::Server::builder()
        .add_service(service.into_service())
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            shutdown.cancelled().await;
            info!("gRPC server draining");
        })
        .await
}
