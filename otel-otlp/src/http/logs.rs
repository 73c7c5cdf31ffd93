use super::HttpTransport;
use crate::config::{ExporterConfig, Protocol};
use crate::endpoint::{resolve_http_endpoint, Signal};
use crate::transform::logs::records_to_resource_logs;
use crate::Error;
use futures_util::future::BoxFuture;
use opentelemetry_proto::tonic::collector::logs::v1::{
    ExportLogsServiceRequest, ExportLogsServiceResponse,
};
use otel_sdk::clock::{Clock, SystemClock};
use otel_sdk::error::{ExportError, ExportResult};
use otel_sdk::logs::{LogBatch, LogExporter};
use otel_sdk::otel_warn;
use otel_sdk::resource::Resource;

pub struct HttpLogExporter<C: Clock = SystemClock> {
    transport: HttpTransport<C>,
}

impl HttpLogExporter<SystemClock> {
    pub fn new(config: ExporterConfig, signal_endpoint: Option<&str>) -> Result<Self, Error> {
        Self::with_clock(config, signal_endpoint, SystemClock)
    }
}

impl<C: Clock> HttpLogExporter<C> {
    pub fn with_clock(
        config: ExporterConfig,
        signal_endpoint: Option<&str>,
        clock: C,
    ) -> Result<Self, Error> {
        config.validate()?;
        let endpoint = resolve_http_endpoint(Signal::Logs, signal_endpoint, Some(&config.endpoint));
        url::Url::parse(&endpoint).map_err(|e| Error::InvalidEndpoint(endpoint.clone(), e))?;
        Ok(HttpLogExporter {
            transport: HttpTransport::new(&config, endpoint, clock)?,
        })
    }
}

impl<C: Clock> std::fmt::Debug for HttpLogExporter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLogExporter").finish()
    }
}

impl<C: Clock> LogExporter for HttpLogExporter<C> {
    fn export(&self, batch: LogBatch) -> BoxFuture<'static, ExportResult> {
        let resource_logs = records_to_resource_logs(
            batch.records,
            &batch.resource,
            batch.scope.name,
            batch.scope.version,
        );
        let request = ExportLogsServiceRequest { resource_logs };
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
    request: ExportLogsServiceRequest,
) -> Result<ExportLogsServiceResponse, ExportError> {
    #[cfg(feature = "http-json")]
    if transport.protocol() == Protocol::HttpJson {
        let body = serde_json::to_vec(&request)
            .map_err(|e| ExportError::ResponseMalformed(e.to_string()))?;
        return super::send_json(transport, body).await;
    }
    #[cfg(feature = "http-proto")]
    {
        let body = <ExportLogsServiceRequest as prost::Message>::encode_to_vec(&request);
        return transport.send_protobuf(body).await;
    }
    #[cfg(not(feature = "http-proto"))]
    {
        let _ = request;
        Err(ExportError::Transport("no HTTP encoding feature enabled".into()))
    }
}

fn log_partial_success(response: ExportLogsServiceResponse) {
    if let Some(partial) = response.partial_success {
        if partial.rejected_log_records > 0 || !partial.error_message.is_empty() {
            otel_warn!(
                name: "http_log_exporter.partial_success",
                rejected_count = partial.rejected_log_records as u64
            );
        }
    }
}
