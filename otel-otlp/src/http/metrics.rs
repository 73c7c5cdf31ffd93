use super::HttpTransport;
use crate::config::{ExporterConfig, Protocol};
use crate::endpoint::{resolve_http_endpoint, Signal};
use crate::transform::metrics::to_proto_resource_metrics;
use crate::Error;
use futures_util::future::BoxFuture;
use opentelemetry_proto::tonic::collector::metrics::v1::{
    ExportMetricsServiceRequest, ExportMetricsServiceResponse,
};
use otel_sdk::clock::{Clock, SystemClock};
use otel_sdk::error::{ExportError, ExportResult};
use otel_sdk::metrics::{MetricsExporter, ResourceMetrics};
use otel_sdk::otel_warn;
use otel_sdk::resource::Resource;

pub struct HttpMetricsExporter<C: Clock = SystemClock> {
    transport: HttpTransport<C>,
}

impl HttpMetricsExporter<SystemClock> {
    pub fn new(config: ExporterConfig, signal_endpoint: Option<&str>) -> Result<Self, Error> {
        Self::with_clock(config, signal_endpoint, SystemClock)
    }
}

impl<C: Clock> HttpMetricsExporter<C> {
    pub fn with_clock(
        config: ExporterConfig,
        signal_endpoint: Option<&str>,
        clock: C,
    ) -> Result<Self, Error> {
        config.validate()?;
        let endpoint =
            resolve_http_endpoint(Signal::Metrics, signal_endpoint, Some(&config.endpoint));
        url::Url::parse(&endpoint).map_err(|e| Error::InvalidEndpoint(endpoint.clone(), e))?;
        Ok(HttpMetricsExporter {
            transport: HttpTransport::new(&config, endpoint, clock)?,
        })
    }
}

impl<C: Clock> std::fmt::Debug for HttpMetricsExporter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMetricsExporter").finish()
    }
}

impl<C: Clock> MetricsExporter for HttpMetricsExporter<C> {
    fn export(&self, metrics: ResourceMetrics) -> BoxFuture<'static, ExportResult> {
        let resource_metrics = vec![to_proto_resource_metrics(&metrics)];
        let request = ExportMetricsServiceRequest { resource_metrics };
        let transport = self.transport.clone();
        Box::pin(async move {
            let response = send(&transport, request).await?;
            log_partial_success(response);
            Ok(())
        })
    }

    fn set_resource(&self, _resource: &Resource) {}
}

async fn send(
    transport: &HttpTransport<impl Clock>,
    request: ExportMetricsServiceRequest,
) -> Result<ExportMetricsServiceResponse, ExportError> {
    #[cfg(feature = "http-json")]
    if transport.protocol() == Protocol::HttpJson {
        let body = serde_json::to_vec(&request)
            .map_err(|e| ExportError::ResponseMalformed(e.to_string()))?;
        return super::send_json(transport, body).await;
    }
    #[cfg(feature = "http-proto")]
    {
        let body = <ExportMetricsServiceRequest as prost::Message>::encode_to_vec(&request);
        return transport.send_protobuf(body).await;
    }
    #[cfg(not(feature = "http-proto"))]
    {
        let _ = request;
        Err(ExportError::Transport("no HTTP encoding feature enabled".into()))
    }
}

fn log_partial_success(response: ExportMetricsServiceResponse) {
    if let Some(partial) = response.partial_success {
        if partial.rejected_data_points > 0 || !partial.error_message.is_empty() {
            otel_warn!(
                name: "http_metrics_exporter.partial_success",
                rejected_count = partial.rejected_data_points as u64
            );
        }
    }
}
