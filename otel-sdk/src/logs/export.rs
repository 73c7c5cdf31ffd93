use super::LogRecord;
use crate::resource::{InstrumentationScope, Resource};
use futures_util::future::BoxFuture;

pub use crate::error::ExportResult;

/// A batch of log records plus the resource/scope they are wrapped in
/// before being handed to a [`LogExporter`].
#[derive(Debug)]
pub struct LogBatch {
    pub records: Vec<LogRecord>,
    pub resource: Resource,
    pub scope: InstrumentationScope,
}

pub trait LogExporter: Send + Sync + std::fmt::Debug {
    fn export(&self, batch: LogBatch) -> BoxFuture<'static, ExportResult>;

    fn force_flush(&self) -> BoxFuture<'static, ExportResult> {
        Box::pin(async { Ok(()) })
    }

    fn shutdown(&self) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    fn set_resource(&self, _resource: &Resource) {}
}
