//! External scaler gRPC service.
//!
//! Implements the four-method `ExternalScaler` contract KEDA calls. The
//! service holds no per-call state: every fetching method asks the data
//! source for a fresh reading, applies the configured failure policy,
//! and shapes the response.

use std::sync::Arc;
use std::time::Duration;

use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info};

use extscale_core::{
    to_metric, ActivityRule, FailurePolicy, FetchError, MetricConfig, Reading, ScalerConfig,
};
use extscale_source::DataSource;

use crate::proto;
use crate::proto::external_scaler_server::{ExternalScaler, ExternalScalerServer};
use crate::status::fetch_status;
use crate::stream::{ActivityItem, ActivityStream};

/// gRPC implementation of the external scaler.
pub struct ExternalScalerService {
    source: Arc<dyn DataSource>,
    policy: FailurePolicy,
    activity: ActivityRule,
    metric: MetricConfig,
    stream_interval: Duration,
    /// Parent of every stream's cancellation token.
    shutdown: CancellationToken,
}

impl ExternalScalerService {
    /// Create a service answering from `source` with the given config.
    pub fn new(config: &ScalerConfig, source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            policy: config.on_error,
            activity: config.activity,
            metric: config.metric.clone(),
            stream_interval: config.stream_interval,
            shutdown: CancellationToken::new(),
        }
    }

    /// Tie open streams to a process-wide shutdown token.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Get the tonic service for mounting on a gRPC server.
    pub fn into_service(self) -> ExternalScalerServer<Self> {
        ExternalScalerServer::new(self)
    }

    /// One fetch with the failure policy applied.
    async fn reading(&self) -> Result<Reading, FetchError> {
        self.policy.resolve(self.source.fetch().await)
    }

    fn metric_spec(&self) -> proto::MetricSpec {
        proto::MetricSpec {
            metric_name: self.metric.name.clone(),
            target_size: self.metric.target_size,
            ..Default::default()
        }
    }
}

#[tonic::async_trait]
impl ExternalScaler for ExternalScalerService {
    async fn is_active(
        &self,
        request: Request<proto::ScaledObjectRef>,
    ) -> Result<Response<proto::IsActiveResponse>, Status> {
        let scaled = request.into_inner();

        let reading = self.reading().await.map_err(|e| {
            error!(error = %e, kind = e.kind(), name = %scaled.name, "IsActive fetch failed");
            fetch_status(&e)
        })?;
        let result = self.activity.is_active(&reading);

        debug!(
            name = %scaled.name,
            namespace = %scaled.namespace,
            value = %reading.value,
            comparison = self.activity.comparison.symbol(),
            threshold = self.activity.threshold,
            result,
            "IsActive"
        );

        Ok(Response::new(proto::IsActiveResponse { result }))
    }

    type StreamIsActiveStream = ReceiverStream<ActivityItem>;

    async fn stream_is_active(
        &self,
        request: Request<proto::ScaledObjectRef>,
    ) -> Result<Response<Self::StreamIsActiveStream>, Status> {
        let scaled = request.into_inner();
        info!(name = %scaled.name, namespace = %scaled.namespace, "StreamIsActive opened");

        let stream = ActivityStream::new(
            Arc::clone(&self.source),
            self.policy,
            self.activity,
            self.stream_interval,
            self.shutdown.child_token(),
        )
        .spawn();

        Ok(Response::new(stream))
    }

    async fn get_metric_spec(
        &self,
        request: Request<proto::ScaledObjectRef>,
    ) -> Result<Response<proto::GetMetricSpecResponse>, Status> {
        let scaled = request.into_inner();
        let spec = self.metric_spec();

        debug!(
            name = %scaled.name,
            metric = %spec.metric_name,
            target = spec.target_size,
            "GetMetricSpec"
        );

        Ok(Response::new(proto::GetMetricSpecResponse {
            metric_specs: vec![spec],
        }))
    }

    async fn get_metrics(
        &self,
        request: Request<proto::GetMetricsRequest>,
    ) -> Result<Response<proto::GetMetricsResponse>, Status> {
        let req = request.into_inner();
        let name = req
            .scaled_object_ref
            .as_ref()
            .map(|r| r.name.as_str())
            .unwrap_or_default();

        let reading = self.reading().await.map_err(|e| {
            error!(error = %e, kind = e.kind(), %name, "GetMetrics fetch failed");
            fetch_status(&e)
        })?;
        let metric_value = to_metric(&reading);

        debug!(
            %name,
            requested = %req.metric_name,
            raw = %reading.value,
            metric_value,
            "GetMetrics"
        );

        Ok(Response::new(proto::GetMetricsResponse {
            metric_values: vec![proto::MetricValue {
                metric_name: self.metric.name.clone(),
                metric_value,
                ..Default::default()
            }],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extscale_core::SourceKind;
    use extscale_source::FetchFuture;
    use tokio_stream::StreamExt;
    use tonic::Code;

    #[derive(Debug)]
    struct FixedSource(Result<Reading, FetchError>);

    impl DataSource for FixedSource {
        fn fetch(&self) -> FetchFuture<'_> {
            let outcome = self.0.clone();
            Box::pin(async move { outcome })
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    fn service(kind: SourceKind, outcome: Result<Reading, FetchError>) -> ExternalScalerService {
        let mut config = ScalerConfig::for_kind(kind);
        config.stream_interval = Duration::from_millis(10);
        ExternalScalerService::new(&config, Arc::new(FixedSource(outcome)))
    }

    fn scaled_ref() -> proto::ScaledObjectRef {
        proto::ScaledObjectRef {
            name: "worker".to_string(),
            namespace: "default".to_string(),
            ..Default::default()
        }
    }

    fn metrics_request() -> proto::GetMetricsRequest {
        proto::GetMetricsRequest {
            scaled_object_ref: Some(scaled_ref()),
            metric_name: "constant_metric".to_string(),
        }
    }

    #[tokio::test]
    async fn socket_reading_above_threshold_is_active() {
        let svc = service(SourceKind::Socket, Ok(Reading::float(301.0).with_timestamp("t1")));

        let active = svc.is_active(Request::new(scaled_ref())).await.unwrap();
        assert!(active.into_inner().result);

        let metrics = svc.get_metrics(Request::new(metrics_request())).await.unwrap();
        let values = metrics.into_inner().metric_values;
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].metric_name, "constant_metric");
        assert_eq!(values[0].metric_value, 301);
    }

    #[tokio::test]
    async fn socket_reading_at_threshold_is_inactive() {
        let svc = service(SourceKind::Socket, Ok(Reading::float(300.0)));
        let active = svc.is_active(Request::new(scaled_ref())).await.unwrap();
        assert!(!active.into_inner().result);
    }

    #[tokio::test]
    async fn socket_failure_fails_open() {
        let svc = service(
            SourceKind::Socket,
            Err(FetchError::decode("127.0.0.1:8082", "not-json")),
        );

        let active = svc.is_active(Request::new(scaled_ref())).await.unwrap();
        assert!(!active.into_inner().result);

        let metrics = svc.get_metrics(Request::new(metrics_request())).await.unwrap();
        assert_eq!(metrics.into_inner().metric_values[0].metric_value, 0);
    }

    #[tokio::test]
    async fn file_negative_action_is_inactive() {
        let svc = service(SourceKind::File, Ok(Reading::integer(-1)));

        let active = svc.is_active(Request::new(scaled_ref())).await.unwrap();
        assert!(!active.into_inner().result);

        let metrics = svc.get_metrics(Request::new(metrics_request())).await.unwrap();
        assert_eq!(metrics.into_inner().metric_values[0].metric_value, -1);
    }

    #[tokio::test]
    async fn file_zero_action_is_active() {
        let svc = service(SourceKind::File, Ok(Reading::integer(0)));
        let active = svc.is_active(Request::new(scaled_ref())).await.unwrap();
        assert!(active.into_inner().result);
    }

    #[tokio::test]
    async fn file_failure_fails_closed() {
        let svc = service(
            SourceKind::File,
            Err(FetchError::read("/tmp/shared_file.json", "no such file")),
        );

        let status = svc.is_active(Request::new(scaled_ref())).await.unwrap_err();
        assert_eq!(status.code(), Code::Unavailable);

        let status = svc.get_metrics(Request::new(metrics_request())).await.unwrap_err();
        assert_eq!(status.code(), Code::Unavailable);
    }

    #[tokio::test]
    async fn metric_spec_is_invariant_and_never_fetches() {
        let svc = service(SourceKind::Socket, Err(FetchError::connect("feed", "refused")));

        let first = svc
            .get_metric_spec(Request::new(scaled_ref()))
            .await
            .unwrap()
            .into_inner();
        let other_ref = proto::ScaledObjectRef {
            name: "other".to_string(),
            namespace: "prod".to_string(),
            ..Default::default()
        };
        let second = svc
            .get_metric_spec(Request::new(other_ref))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(first, second);
        assert_eq!(first.metric_specs.len(), 1);
        assert_eq!(first.metric_specs[0].metric_name, "constant_metric");
        assert_eq!(first.metric_specs[0].target_size, 300);
    }

    #[tokio::test]
    async fn file_metric_spec_targets_one() {
        let svc = service(SourceKind::File, Ok(Reading::integer(2)));
        let spec = svc
            .get_metric_spec(Request::new(scaled_ref()))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(spec.metric_specs[0].target_size, 1);
    }

    #[tokio::test]
    async fn metrics_request_without_ref_still_answers() {
        let svc = service(SourceKind::Socket, Ok(Reading::float(12.9)));
        let metrics = svc
            .get_metrics(Request::new(proto::GetMetricsRequest::default()))
            .await
            .unwrap();
        assert_eq!(metrics.into_inner().metric_values[0].metric_value, 12);
    }

    #[tokio::test]
    async fn stream_uses_same_rule_as_unary() {
        let svc = service(SourceKind::File, Ok(Reading::integer(0)));
        let mut stream = svc
            .stream_is_active(Request::new(scaled_ref()))
            .await
            .unwrap()
            .into_inner();

        assert!(stream.next().await.unwrap().unwrap().result);
    }

    #[tokio::test]
    async fn shutdown_token_ends_open_streams() {
        let shutdown = CancellationToken::new();
        let svc = service(SourceKind::Socket, Ok(Reading::float(1.0))).with_shutdown(shutdown.clone());
        let mut stream = svc
            .stream_is_active(Request::new(scaled_ref()))
            .await
            .unwrap()
            .into_inner();

        assert!(!stream.next().await.unwrap().unwrap().result);
        shutdown.cancel();

        let ended = tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(item) = stream.next().await {
                assert!(item.is_ok());
            }
        })
        .await;
        assert!(ended.is_ok());
    }
}
