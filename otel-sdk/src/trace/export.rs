use super::FinishedSpan;
use crate::resource::{InstrumentationScope, Resource};
use futures_util::future::BoxFuture;

pub use crate::error::ExportResult;

/// A batch handed to a [`SpanExporter`]: at most `maxExportBatchSize`
/// spans, wrapped in exactly one resource and one instrumentation scope
/// (spec.md §3 invariant).
#[derive(Debug)]
pub struct SpanBatch {
    pub spans: Vec<FinishedSpan>,
    pub resource: Resource,
    pub scope: InstrumentationScope,
}

/// Protocol-specific exporters implement this so they can be plugged into
/// [`super::BatchSpanProcessor`]. Exporters are stateless with respect to
/// concurrent `export` calls: the force-flush path may invoke several
/// concurrently (spec.md §5).
pub trait SpanExporter: Send + Sync + std::fmt::Debug {
    /// Never called concurrently with itself for overlapping sub-batches
    /// from the *same* flush is untrue in general (force_flush fans out),
    /// so implementations must not assume exclusive access to shared
    /// state without their own synchronization.
    fn export(&self, batch: SpanBatch) -> BoxFuture<'static, ExportResult>;

    /// Push-model exporters (HTTP/gRPC) have nothing buffered locally, so
    /// the default is a no-op.
    fn force_flush(&self) -> BoxFuture<'static, ExportResult> {
        Box::pin(async { Ok(()) })
    }

    fn shutdown(&self) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    fn set_resource(&self, _resource: &Resource) {}
}
