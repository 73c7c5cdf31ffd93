//! Bootstrap-time errors (spec.md §7 `config_invalid`). Everything that
//! can go wrong once an exporter is running surfaces as
//! `otel_sdk::ExportError` instead — this enum only covers construction.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] otel_sdk::ConfigError),

    #[error("invalid endpoint {0:?}: {1}")]
    InvalidEndpoint(String, #[source] url::ParseError),

    #[cfg(feature = "grpc-tonic")]
    #[error("failed to build gRPC channel: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[cfg(any(feature = "http-proto", feature = "http-json"))]
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
