//! Serve mode — binds the gRPC listener and runs until Ctrl-C.
//!
//! In this mode, the daemon:
//! 1. Builds the data source selected by configuration
//! 2. Binds the gRPC listener and registers the external scaler
//! 3. On shutdown, cancels every open activity stream and drains the server

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use extscale_core::ScalerConfig;
use extscale_grpc::ExternalScalerService;

/// Run the external scaler until interrupted.
pub async fn run_serve(config: ScalerConfig) -> anyhow::Result<()> {
    let source = extscale_source::from_config(&config.source);
    info!(
        kind = %config.source.kind,
        source = %source.describe(),
        on_error = ?config.on_error,
        comparison = config.activity.comparison.symbol(),
        threshold = config.activity.threshold,
        metric = %config.metric.name,
        target_size = config.metric.target_size,
        stream_interval_ms = config.stream_interval.as_millis() as u64,
        "extscaled starting"
    );

    let shutdown = CancellationToken::new();
    let service = ExternalScalerService::new(&config, source).with_shutdown(shutdown.clone());

    let listener = TcpListener::bind(config.listen).await?;

    // Graceful shutdown on Ctrl-C.
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                signal_token.cancel();
            }
            Err(e) => error!(error = %e, "failed to install Ctrl-C handler"),
        }
    });

    extscale_grpc::serve(listener, service, shutdown).await?;

    info!("extscaled stopped");
    Ok(())
}
