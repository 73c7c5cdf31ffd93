//! Signal-agnostic telemetry pipeline core: data model, batch processors,
//! the periodic metrics reader, resource/scope adapters, and the pluggable
//! clock/timeout machinery that makes all of it testable without real
//! wall-clock waits.
//!
//! Wire encoding and transport (OTLP over HTTP/gRPC) live in a separate
//! crate; this one only moves typed batches from producer to exporter.

pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod logs;
pub mod metrics;
#[macro_use]
mod internal_log;
pub mod resource;
#[cfg(feature = "testing")]
pub mod testing;
pub mod timeout;
pub mod trace;
pub mod value;

pub use error::{ConfigError, ExportError, ExportResult};
