use std::time::Duration;

/// Errors surfaced synchronously from bootstrap/builder code.
///
/// Per spec, these are the only errors that ever reach an application
/// caller directly; everything else is contained inside the pipeline and
/// only ever observed as a log line.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0} requires both a client certificate and a client key; only one was supplied")]
    IncompleteMtls(&'static str),
    #[error("certificate file not found: {0}")]
    CertificateNotFound(String),
    #[error("signal is disabled: {0}")]
    SignalDisabled(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can come back from an exporter's `export` call.
///
/// These never propagate out of a processor: the processor logs them at
/// `warn` and moves on to the next tick.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("export failed with status code {0}")]
    Failed(u16),
    #[error("export timed out after {0:?}")]
    TimedOut(Duration),
    #[error("response had missing or unsupported content-type: {0}")]
    ResponseMalformed(String),
    #[error("exporter is already shut down")]
    AlreadyShutdown,
    #[error("transport error: {0}")]
    Transport(String),
}

pub type ExportResult = Result<(), ExportError>;
