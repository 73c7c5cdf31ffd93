//! Composes a processor and its exporter into one supervised service per
//! signal, then composes the three signal groups into a single pipeline
//! with ordered graceful shutdown (spec.md §4.8).
//!
//! Each processor already shuts its own exporter down as the last step of
//! its own `shutdown()` (force-flush, then exporter shutdown), so the
//! ordering guarantee this module owns is one level up: all three signal
//! groups are told to shut down together, and the pipeline only reports
//! itself terminated once every group has finished draining.

use crate::logs::LogProcessor;
use crate::metrics::PeriodicMetricsReader;
use crate::otel_error;
use crate::trace::SpanProcessor;
use futures_util::future::BoxFuture;
use std::sync::Arc;

/// One signal's processor, abstracted so [`Pipeline`] can supervise traces,
/// logs and metrics uniformly even though their processor traits differ.
pub trait PipelineService: Send + Sync + std::fmt::Debug {
    /// Drains and shuts down. Errors are logged here, not propagated:
    /// per spec.md §7 a child service failing only triggers shutdown of
    /// its siblings, it is never surfaced to the caller of `shutdown`.
    fn shutdown(&self) -> BoxFuture<'static, ()>;
}

#[derive(Debug)]
pub struct TracePipelineService(pub Arc<dyn SpanProcessor>);

impl PipelineService for TracePipelineService {
    fn shutdown(&self) -> BoxFuture<'static, ()> {
        let processor = self.0.clone();
        Box::pin(async move {
            if let Err(err) = processor.shutdown().await {
                otel_error!(name: "pipeline.trace_shutdown_failed", error = format!("{err}"));
            }
        })
    }
}

#[derive(Debug)]
pub struct LogPipelineService(pub Arc<dyn LogProcessor>);

impl PipelineService for LogPipelineService {
    fn shutdown(&self) -> BoxFuture<'static, ()> {
        let processor = self.0.clone();
        Box::pin(async move {
            if let Err(err) = processor.shutdown().await {
                otel_error!(name: "pipeline.log_shutdown_failed", error = format!("{err}"));
            }
        })
    }
}

#[derive(Debug)]
pub struct MetricsPipelineService(pub Arc<PeriodicMetricsReader>);

impl PipelineService for MetricsPipelineService {
    fn shutdown(&self) -> BoxFuture<'static, ()> {
        let reader = self.0.clone();
        Box::pin(async move {
            reader.shutdown().await;
        })
    }
}

/// The top-level supervised group: the three per-signal groups, each
/// configured with `successTerminationBehavior = gracefullyShutdownGroup`
/// and `failureTerminationBehavior = gracefullyShutdownGroup` in spec
/// terms — here, simply: every group is asked to shut down whenever the
/// pipeline as a whole is asked to shut down, and the pipeline's own
/// `shutdown` only resolves once all of them have.
#[derive(Default, Debug)]
pub struct Pipeline {
    services: Vec<Arc<dyn PipelineService>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline::default()
    }

    pub fn add(&mut self, service: Arc<dyn PipelineService>) -> &mut Self {
        self.services.push(service);
        self
    }

    /// Shuts every signal group down concurrently; returns once all have
    /// finished draining. Safe to call more than once — each underlying
    /// processor's own `shutdown` is idempotent.
    pub async fn shutdown(&self) {
        let shutdowns = self.services.iter().map(|s| s.shutdown());
        futures_util::future::join_all(shutdowns).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::logs::{BatchConfig as LogBatchConfig, BatchLogProcessor, LogBatch, LogExporter};
    use crate::resource::Resource;
    use crate::trace::{BatchConfig, BatchSpanProcessor, ExportResult as SpanExportResult, SpanBatch, SpanExporter};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Default)]
    struct NoopSpanExporter {
        shut_down: std::sync::Arc<AtomicBool>,
    }

    impl SpanExporter for NoopSpanExporter {
        fn export(&self, _batch: SpanBatch) -> BoxFuture<'static, SpanExportResult> {
            Box::pin(async { Ok(()) })
        }

        fn shutdown(&self) -> BoxFuture<'static, ()> {
            let flag = self.shut_down.clone();
            Box::pin(async move {
                flag.store(true, Ordering::SeqCst);
            })
        }
    }

    #[derive(Debug, Default)]
    struct NoopLogExporter {
        shut_down: std::sync::Arc<AtomicBool>,
    }

    impl LogExporter for NoopLogExporter {
        fn export(&self, _batch: LogBatch) -> BoxFuture<'static, crate::logs::ExportResult> {
            Box::pin(async { Ok(()) })
        }

        fn shutdown(&self) -> BoxFuture<'static, ()> {
            let flag = self.shut_down.clone();
            Box::pin(async move {
                flag.store(true, Ordering::SeqCst);
            })
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutting_down_pipeline_shuts_down_every_group() {
        let span_exporter = Arc::new(NoopSpanExporter::default());
        let span_flag = span_exporter.shut_down.clone();
        let span_processor: Arc<dyn SpanProcessor> = Arc::new(BatchSpanProcessor::with_clock(
            span_exporter,
            BatchConfig::default(),
            TestClock::new(),
        ));

        let log_exporter = Arc::new(NoopLogExporter::default());
        let log_flag = log_exporter.shut_down.clone();
        let log_processor: Arc<dyn LogProcessor> = Arc::new(BatchLogProcessor::with_clock(
            log_exporter,
            LogBatchConfig::default(),
            TestClock::new(),
        ));

        let mut pipeline = Pipeline::new();
        pipeline.add(Arc::new(TracePipelineService(span_processor)));
        pipeline.add(Arc::new(LogPipelineService(log_processor)));
        pipeline.shutdown().await;

        assert!(span_flag.load(Ordering::SeqCst));
        assert!(log_flag.load(Ordering::SeqCst));
        let _ = Resource::default();
    }
}
