//! In-memory exporters for use in downstream integration tests, gated
//! behind the `testing` feature so they never ship in a release build.
//! Mirrors the teacher's `testing::logs`/`testing::trace` in-memory
//! exporters.

use crate::logs::{ExportResult as LogExportResult, LogBatch, LogExporter, LogRecord};
use crate::metrics::{ExportResult as MetricsExportResult, MetricsExporter, ResourceMetrics};
use crate::resource::Resource;
use crate::trace::{ExportResult as SpanExportResult, FinishedSpan, SpanBatch, SpanExporter};
use futures_util::future::BoxFuture;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct InMemorySpanExporter {
    spans: Mutex<Vec<FinishedSpan>>,
}

impl InMemorySpanExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_finished_spans(&self) -> Vec<FinishedSpan> {
        self.spans.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.spans.lock().unwrap().clear();
    }
}

impl SpanExporter for InMemorySpanExporter {
    fn export(&self, batch: SpanBatch) -> BoxFuture<'static, SpanExportResult> {
        self.spans.lock().unwrap().extend(batch.spans);
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLogExporter {
    records: Mutex<Vec<LogRecord>>,
}

impl InMemoryLogExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_emitted_logs(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.records.lock().unwrap().clear();
    }
}

impl LogExporter for InMemoryLogExporter {
    fn export(&self, batch: LogBatch) -> BoxFuture<'static, LogExportResult> {
        self.records.lock().unwrap().extend(batch.records);
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMetricsExporter {
    snapshots: Mutex<Vec<ResourceMetrics>>,
}

impl InMemoryMetricsExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_finished_metrics(&self) -> Vec<ResourceMetrics> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.snapshots.lock().unwrap().clear();
    }
}

impl MetricsExporter for InMemoryMetricsExporter {
    fn export(&self, metrics: ResourceMetrics) -> BoxFuture<'static, MetricsExportResult> {
        self.snapshots.lock().unwrap().push(metrics);
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::InstrumentationScope;
    use crate::trace::{SpanContext, SpanId, SpanKind, Status, TraceFlags, TraceId};

    #[tokio::test]
    async fn records_exported_spans() {
        let exporter = InMemorySpanExporter::new();
        let span = FinishedSpan {
            span_context: SpanContext {
                trace_id: TraceId([1; 16]),
                span_id: SpanId([2; 8]),
                trace_flags: TraceFlags(1),
            },
            parent_span_id: None,
            name: "op".into(),
            kind: SpanKind::Internal,
            status: Status::Unset,
            start_time_unix_nanos: 0,
            end_time_unix_nanos: 1,
            attributes: Vec::new(),
            events: Vec::new(),
            links: Vec::new(),
            resource: Resource::default(),
        };
        exporter
            .export(SpanBatch {
                spans: vec![span],
                resource: Resource::default(),
                scope: InstrumentationScope::pipeline(),
            })
            .await
            .unwrap();

        assert_eq!(exporter.get_finished_spans().len(), 1);
        exporter.reset();
        assert!(exporter.get_finished_spans().is_empty());
    }
}
