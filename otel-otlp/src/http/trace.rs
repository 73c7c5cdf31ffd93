use super::HttpTransport;
use crate::config::{ExporterConfig, Protocol};
use crate::endpoint::{resolve_http_endpoint, Signal};
use crate::transform::trace::spans_to_resource_spans;
use crate::Error;
use futures_util::future::BoxFuture;
use opentelemetry_proto::tonic::collector::trace::v1::{
    ExportTraceServiceRequest, ExportTraceServiceResponse,
};
use otel_sdk::clock::{Clock, SystemClock};
use otel_sdk::error::{ExportError, ExportResult};
use otel_sdk::otel_warn;
use otel_sdk::resource::Resource;
use otel_sdk::trace::{SpanBatch, SpanExporter};

pub struct HttpTraceExporter<C: Clock = SystemClock> {
    transport: HttpTransport<C>,
}

impl HttpTraceExporter<SystemClock> {
    pub fn new(config: ExporterConfig, signal_endpoint: Option<&str>) -> Result<Self, Error> {
        Self::with_clock(config, signal_endpoint, SystemClock)
    }
}

impl<C: Clock> HttpTraceExporter<C> {
    pub fn with_clock(
        config: ExporterConfig,
        signal_endpoint: Option<&str>,
        clock: C,
    ) -> Result<Self, Error> {
        config.validate()?;
        let endpoint = resolve_http_endpoint(Signal::Traces, signal_endpoint, Some(&config.endpoint));
        url::Url::parse(&endpoint).map_err(|e| Error::InvalidEndpoint(endpoint.clone(), e))?;
        Ok(HttpTraceExporter {
            transport: HttpTransport::new(&config, endpoint, clock)?,
        })
    }
}

impl<C: Clock> std::fmt::Debug for HttpTraceExporter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTraceExporter").finish()
    }
}

impl<C: Clock> SpanExporter for HttpTraceExporter<C> {
    fn export(&self, batch: SpanBatch) -> BoxFuture<'static, ExportResult> {
        let resource_spans = spans_to_resource_spans(
            batch.spans,
            &batch.resource,
            batch.scope.name,
            batch.scope.version,
        );
        let request = ExportTraceServiceRequest { resource_spans };
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
    request: ExportTraceServiceRequest,
) -> Result<ExportTraceServiceResponse, ExportError> {
    #[cfg(feature = "http-json")]
    if transport.protocol() == Protocol::HttpJson {
        let body = serde_json::to_vec(&request)
            .map_err(|e| ExportError::ResponseMalformed(e.to_string()))?;
        return super::send_json(transport, body).await;
    }
    #[cfg(feature = "http-proto")]
    {
        let body = <ExportTraceServiceRequest as prost::Message>::encode_to_vec(&request);
        return transport.send_protobuf(body).await;
    }
    #[cfg(not(feature = "http-proto"))]
    {
        let _ = request;
        Err(ExportError::Transport("no HTTP encoding feature enabled".into()))
    }
}

fn log_partial_success(response: ExportTraceServiceResponse) {
    if let Some(partial) = response.partial_success {
        if partial.rejected_spans > 0 || !partial.error_message.is_empty() {
            otel_warn!(
                name: "http_trace_exporter.partial_success",
                rejected_count = partial.rejected_spans as u64
            );
        }
    }
}

