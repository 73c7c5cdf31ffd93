use super::{build_channel, Inflight};
use crate::config::ExporterConfig;
use crate::transform::metrics::to_proto_resource_metrics;
use crate::Error;
use futures_util::future::BoxFuture;
use opentelemetry_proto::tonic::collector::metrics::v1::metrics_service_client::MetricsServiceClient;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use otel_sdk::error::{ExportError, ExportResult};
use otel_sdk::metrics::{MetricsExporter, ResourceMetrics};
use otel_sdk::otel_warn;
use otel_sdk::resource::Resource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tonic::transport::Channel;

pub struct GrpcMetricsExporter {
    client: Arc<Mutex<Option<MetricsServiceClient<Channel>>>>,
    inflight: Inflight,
    shutdown_timeout: Duration,
}

impl GrpcMetricsExporter {
    pub fn new(config: ExporterConfig) -> Result<Self, Error> {
        let channel = build_channel(&config)?;
        let mut client = MetricsServiceClient::new(channel);
        if let Some(encoding) = crate::compression::tonic_encoding(config.compression) {
            client = client.send_compressed(encoding).accept_compressed(encoding);
        }
        Ok(GrpcMetricsExporter {
            client: Arc::new(Mutex::new(Some(client))),
            inflight: Inflight::default(),
            shutdown_timeout: config.shutdown_timeout,
        })
    }
}

impl std::fmt::Debug for GrpcMetricsExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcMetricsExporter").finish()
    }
}

impl MetricsExporter for GrpcMetricsExporter {
    fn export(&self, metrics: ResourceMetrics) -> BoxFuture<'static, ExportResult> {
        let resource_metrics = vec![to_proto_resource_metrics(&metrics)];
        let request = ExportMetricsServiceRequest { resource_metrics };
        let inflight = self.inflight.clone();

        let client = self.client.clone();
        Box::pin(async move {
            let mut client = client
                .lock()
                .await
                .clone()
                .ok_or(ExportError::AlreadyShutdown)?;
            let _permit = inflight.enter();
            let response = client.export(tonic::Request::new(request)).await;
            let response = response.map_err(|status| ExportError::Failed(status.code() as u16))?;
            if let Some(partial) = response.into_inner().partial_success {
                if partial.rejected_data_points > 0 || !partial.error_message.is_empty() {
                    otel_warn!(
                        name: "grpc_metrics_exporter.partial_success",
                        rejected_count = partial.rejected_data_points as u64
                    );
                }
            }
            Ok(())
        })
    }

    fn shutdown(&self) -> BoxFuture<'static, ()> {
        let client = self.client.clone();
        let inflight = self.inflight.clone();
        let timeout = self.shutdown_timeout;
        Box::pin(async move {
            inflight.drain(timeout).await;
            client.lock().await.take();
        })
    }

    fn set_resource(&self, _resource: &Resource) {}
}
