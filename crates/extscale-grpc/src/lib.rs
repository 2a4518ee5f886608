//! extscale-grpc — the KEDA external scaler adapter.
//!
//! # Architecture
//!
//! ```text
//! KEDA operator
//!   └── ExternalScaler (gRPC)
//!       ├── IsActive()       → fetch → FailurePolicy → ActivityRule
//!       ├── GetMetricSpec()  → static metric name + target
//!       ├── GetMetrics()     → fetch → FailurePolicy → to_metric
//!       └── StreamIsActive() → one ActivityStream task per caller
//!                              ticking until hang-up or shutdown
//! ```

pub mod server;
pub mod service;
pub mod status;
pub mod stream;

/// Generated protobuf types and gRPC service stubs.
pub mod proto {
    tonic::include_proto!("externalscaler");
}

pub use server::serve;
pub use service::ExternalScalerService;
