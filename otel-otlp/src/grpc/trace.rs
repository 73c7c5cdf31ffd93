use super::{build_channel, Inflight};
use crate::config::ExporterConfig;
use crate::transform::trace::spans_to_resource_spans;
use crate::Error;
use futures_util::future::BoxFuture;
use opentelemetry_proto::tonic::collector::trace::v1::trace_service_client::TraceServiceClient;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use otel_sdk::error::{ExportError, ExportResult};
use otel_sdk::otel_warn;
use otel_sdk::resource::Resource;
use otel_sdk::trace::{SpanBatch, SpanExporter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tonic::transport::Channel;

pub struct GrpcTraceExporter {
    client: Arc<Mutex<Option<TraceServiceClient<Channel>>>>,
    inflight: Inflight,
    shutdown_timeout: Duration,
}

impl GrpcTraceExporter {
    pub fn new(config: ExporterConfig) -> Result<Self, Error> {
        let channel = build_channel(&config)?;
        let mut client = TraceServiceClient::new(channel);
        if let Some(encoding) = crate::compression::tonic_encoding(config.compression) {
            client = client.send_compressed(encoding).accept_compressed(encoding);
        }
        Ok(GrpcTraceExporter {
            client: Arc::new(Mutex::new(Some(client))),
            inflight: Inflight::default(),
            shutdown_timeout: config.shutdown_timeout,
        })
    }
}

impl std::fmt::Debug for GrpcTraceExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcTraceExporter").finish()
    }
}

impl SpanExporter for GrpcTraceExporter {
    fn export(&self, batch: SpanBatch) -> BoxFuture<'static, ExportResult> {
        let resource_spans = spans_to_resource_spans(
            batch.spans,
            &batch.resource,
            batch.scope.name,
            batch.scope.version,
        );
        let request = ExportTraceServiceRequest { resource_spans };
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
                if partial.rejected_spans > 0 || !partial.error_message.is_empty() {
                    otel_warn!(
                        name: "grpc_trace_exporter.partial_success",
                        rejected_count = partial.rejected_spans as u64
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
