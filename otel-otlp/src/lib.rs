//! OTLP wire adapters (HTTP and gRPC) that plug into the signal-agnostic
//! pipeline: exporters here only know how to turn a batch into bytes on
//! the wire and back, never how it was buffered or scheduled.

pub mod compression;
pub mod config;
pub mod endpoint;
pub mod error;
#[cfg(feature = "grpc-tonic")]
pub mod grpc;
#[cfg(any(feature = "http-proto", feature = "http-json"))]
pub mod http;
pub mod retry;
pub mod transform;

pub use error::Error;
