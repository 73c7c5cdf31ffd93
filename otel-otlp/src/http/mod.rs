//! OTLP/HTTP transport shared by the per-signal exporters (spec.md §4.5).

#[cfg(any(feature = "http-proto", feature = "http-json"))]
pub mod logs;
#[cfg(any(feature = "http-proto", feature = "http-json"))]
pub mod metrics;
#[cfg(any(feature = "http-proto", feature = "http-json"))]
pub mod trace;

use crate::compression::Compression;
use crate::config::{ExporterConfig, Protocol};
use crate::retry::{otlp_decision, Outcome, RetryPolicy};
use otel_sdk::clock::Clock;
use otel_sdk::error::ExportError;
use otel_sdk::{otel_debug, otel_warn};
#[cfg(feature = "http-proto")]
use prost::Message;
use reqwest::Client;
use std::time::Duration;

/// Response bodies are read up to this many bytes (spec.md §4.5).
const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
const DEFAULT_JITTER: f64 = 0.2;

#[derive(Clone)]
pub(crate) struct HttpTransport<C> {
    client: Client,
    endpoint: String,
    headers: Vec<(String, String)>,
    compression: Compression,
    protocol: Protocol,
    clock: C,
}

impl<C: Clock> HttpTransport<C> {
    pub(crate) fn new(
        config: &ExporterConfig,
        endpoint: String,
        clock: C,
    ) -> Result<Self, crate::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(HttpTransport {
            client,
            endpoint,
            headers: config
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            compression: config.compression,
            protocol: config.protocol,
            clock,
        })
    }

    pub(crate) fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn content_type(&self) -> &'static str {
        match self.protocol {
            Protocol::HttpProtobuf => "application/x-protobuf",
            Protocol::HttpJson => "application/json",
            Protocol::Grpc => unreachable!("HttpTransport only serves HTTP protocols"),
        }
    }

    fn encode(&self, body: &[u8]) -> Vec<u8> {
        match self.compression {
            Compression::None => body.to_vec(),
            #[cfg(feature = "gzip-http")]
            Compression::Gzip => {
                crate::compression::gzip_encode(body).unwrap_or_else(|_| body.to_vec())
            }
            #[cfg(not(feature = "gzip-http"))]
            Compression::Gzip => body.to_vec(),
        }
    }

    /// Submits `body` (already encoded per `self.protocol`) through the
    /// OTLP retry loop (spec.md §4.7) and decodes the response per its
    /// own `Content-Type`, not per the protocol the request was sent in
    /// (spec.md §4.5: a collector may reply in either encoding).
    #[cfg(feature = "http-proto")]
    pub(crate) async fn send_protobuf<Resp: DecodableResponse>(
        &self,
        body: Vec<u8>,
    ) -> Result<Resp, ExportError> {
        let body = self.encode(&body);
        let mut policy = RetryPolicy::new(
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_BASE_DELAY,
            DEFAULT_MAX_DELAY,
            DEFAULT_JITTER,
        );

        loop {
            let mut request = self
                .client
                .post(&self.endpoint)
                .header(
                    "User-Agent",
                    format!("OTel-OTLP-Exporter-Rust/{}", env!("CARGO_PKG_VERSION")),
                )
                .header("Connection", "keep-alive")
                .header("Content-Type", self.content_type())
                .body(body.clone());
            for (k, v) in &self.headers {
                request = request.header(k, v);
            }
            if let Some(encoding) = self.compression.as_content_encoding() {
                request = request.header("Content-Encoding", encoding);
            }

            let response = request
                .send()
                .await
                .map_err(|e| ExportError::Transport(e.to_string()))?;
            let status = response.status().as_u16();

            if response.status().is_success() {
                return decode_response(response).await;
            }

            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            otel_debug!(name: "http_exporter.non_success_response", status_code = status);

            match policy.next(otlp_decision(status, retry_after.as_deref())) {
                Outcome::DoNotRetry => return Err(ExportError::Failed(status)),
                Outcome::RetryAfter(delay) => {
                    self.clock.sleep(delay).await;
                }
            }
        }
    }
}

/// A response type this crate can decode. Exactly one of the three impls
/// below is compiled, matching whichever of `http-proto`/`http-json` is
/// enabled, so [`decode_response`] only ever requires the trait bounds
/// its compiled body actually needs.
#[cfg(all(feature = "http-proto", feature = "http-json"))]
pub(crate) trait DecodableResponse: Message + Default + serde::de::DeserializeOwned {}
#[cfg(all(feature = "http-proto", feature = "http-json"))]
impl<T: Message + Default + serde::de::DeserializeOwned> DecodableResponse for T {}

#[cfg(all(feature = "http-proto", not(feature = "http-json")))]
pub(crate) trait DecodableResponse: Message + Default {}
#[cfg(all(feature = "http-proto", not(feature = "http-json")))]
impl<T: Message + Default> DecodableResponse for T {}

#[cfg(all(feature = "http-json", not(feature = "http-proto")))]
pub(crate) trait DecodableResponse: serde::de::DeserializeOwned {}
#[cfg(all(feature = "http-json", not(feature = "http-proto")))]
impl<T: serde::de::DeserializeOwned> DecodableResponse for T {}

/// Decodes a response by its actual `Content-Type`, independent of which
/// protocol the request was sent with (spec.md §4.5).
async fn decode_response<Resp: DecodableResponse>(
    response: reqwest::Response,
) -> Result<Resp, ExportError> {
    let content_type = response_content_type(&response);

    #[cfg(feature = "http-json")]
    if content_type.starts_with("application/json") {
        let bytes = read_capped_body(response).await?;
        return serde_json::from_slice(&bytes)
            .map_err(|e| ExportError::ResponseMalformed(e.to_string()));
    }
    #[cfg(feature = "http-proto")]
    if content_type.starts_with("application/x-protobuf") {
        let bytes = read_capped_body(response).await?;
        return Resp::decode(bytes.as_slice())
            .map_err(|e| ExportError::ResponseMalformed(e.to_string()));
    }

    Err(ExportError::ResponseMalformed(content_type))
}

fn response_content_type(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn read_capped_body(response: reqwest::Response) -> Result<Vec<u8>, ExportError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExportError::Transport(e.to_string()))?;
    if bytes.len() > MAX_RESPONSE_BYTES {
        otel_warn!(name: "http_exporter.response_truncated", response_len = bytes.len() as u64);
        Ok(bytes[..MAX_RESPONSE_BYTES].to_vec())
    } else {
        Ok(bytes.to_vec())
    }
}

#[cfg(feature = "http-json")]
pub(crate) async fn send_json<Resp: DecodableResponse>(
    transport: &HttpTransport<impl Clock>,
    body: Vec<u8>,
) -> Result<Resp, ExportError> {
    let body = transport.encode(&body);
    let mut policy = RetryPolicy::new(
        DEFAULT_MAX_ATTEMPTS,
        DEFAULT_BASE_DELAY,
        DEFAULT_MAX_DELAY,
        DEFAULT_JITTER,
    );
    loop {
        let mut request = transport
            .client
            .post(&transport.endpoint)
            .header(
                "User-Agent",
                format!("OTel-OTLP-Exporter-Rust/{}", env!("CARGO_PKG_VERSION")),
            )
            .header("Connection", "keep-alive")
            .header("Content-Type", "application/json")
            .body(body.clone());
        for (k, v) in &transport.headers {
            request = request.header(k, v);
        }
        if let Some(encoding) = transport.compression.as_content_encoding() {
            request = request.header("Content-Encoding", encoding);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;
        let status = response.status().as_u16();

        if response.status().is_success() {
            return decode_response(response).await;
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        match policy.next(otlp_decision(status, retry_after.as_deref())) {
            Outcome::DoNotRetry => return Err(ExportError::Failed(status)),
            Outcome::RetryAfter(delay) => {
                transport.clock.sleep(delay).await;
            }
        }
    }
}
