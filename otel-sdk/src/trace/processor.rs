use super::export::{ExportResult, SpanBatch, SpanExporter};
use super::FinishedSpan;
use crate::clock::{Clock, SystemClock};
use crate::error::ExportError;
use crate::resource::{InstrumentationScope, Resource};
use crate::timeout::with_timeout;
use crate::{otel_debug, otel_warn};
use futures_util::future::BoxFuture;
use futures_util::{stream, StreamExt as _};
use std::cmp::min;
use std::env;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;

const OTEL_BSP_SCHEDULE_DELAY: &str = "OTEL_BSP_SCHEDULE_DELAY";
const OTEL_BSP_SCHEDULE_DELAY_DEFAULT: u64 = 5_000;
const OTEL_BSP_EXPORT_TIMEOUT: &str = "OTEL_BSP_EXPORT_TIMEOUT";
const OTEL_BSP_EXPORT_TIMEOUT_DEFAULT: u64 = 30_000;
const OTEL_BSP_MAX_QUEUE_SIZE: &str = "OTEL_BSP_MAX_QUEUE_SIZE";
const OTEL_BSP_MAX_QUEUE_SIZE_DEFAULT: usize = 2_048;
const OTEL_BSP_MAX_EXPORT_BATCH_SIZE: &str = "OTEL_BSP_MAX_EXPORT_BATCH_SIZE";
const OTEL_BSP_MAX_EXPORT_BATCH_SIZE_DEFAULT: usize = 512;

/// The interface shared by every span processor (batch or otherwise).
pub trait SpanProcessor: Send + Sync + std::fmt::Debug {
    /// Non-blocking; never fails. Drops unsampled spans.
    fn on_end(&self, span: FinishedSpan);
    fn force_flush(&self) -> BoxFuture<'static, ExportResult>;
    fn shutdown(&self) -> BoxFuture<'static, ExportResult>;
    fn set_resource(&self, resource: Resource);
}

/// Batch processor configuration. Build with [`BatchConfigBuilder`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    max_queue_size: usize,
    scheduled_delay: Duration,
    max_export_batch_size: usize,
    max_export_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfigBuilder::default().build()
    }
}

#[derive(Debug)]
pub struct BatchConfigBuilder {
    max_queue_size: usize,
    scheduled_delay: Duration,
    max_export_batch_size: usize,
    max_export_timeout: Duration,
}

impl Default for BatchConfigBuilder {
    /// Defaults per the OTLP/SDK spec, overridden by `OTEL_BSP_*` env vars
    /// if set:
    /// * `OTEL_BSP_MAX_QUEUE_SIZE` (2048)
    /// * `OTEL_BSP_SCHEDULE_DELAY` (5000ms)
    /// * `OTEL_BSP_MAX_EXPORT_BATCH_SIZE` (512)
    /// * `OTEL_BSP_EXPORT_TIMEOUT` (30000ms)
    fn default() -> Self {
        BatchConfigBuilder {
            max_queue_size: OTEL_BSP_MAX_QUEUE_SIZE_DEFAULT,
            scheduled_delay: Duration::from_millis(OTEL_BSP_SCHEDULE_DELAY_DEFAULT),
            max_export_batch_size: OTEL_BSP_MAX_EXPORT_BATCH_SIZE_DEFAULT,
            max_export_timeout: Duration::from_millis(OTEL_BSP_EXPORT_TIMEOUT_DEFAULT),
        }
        .init_from_env_vars()
    }
}

impl BatchConfigBuilder {
    pub fn with_max_queue_size(mut self, v: usize) -> Self {
        self.max_queue_size = v;
        self
    }

    pub fn with_scheduled_delay(mut self, v: Duration) -> Self {
        self.scheduled_delay = v;
        self
    }

    pub fn with_max_export_timeout(mut self, v: Duration) -> Self {
        self.max_export_timeout = v;
        self
    }

    pub fn with_max_export_batch_size(mut self, v: usize) -> Self {
        self.max_export_batch_size = v;
        self
    }

    /// Enforces `max_export_batch_size <= max_queue_size`.
    pub fn build(self) -> BatchConfig {
        let max_export_batch_size = min(self.max_export_batch_size, self.max_queue_size);
        BatchConfig {
            max_queue_size: self.max_queue_size,
            scheduled_delay: self.scheduled_delay,
            max_export_timeout: self.max_export_timeout,
            max_export_batch_size,
        }
    }

    fn init_from_env_vars(mut self) -> Self {
        if let Some(v) = env::var(OTEL_BSP_MAX_QUEUE_SIZE)
            .ok()
            .and_then(|s| usize::from_str(&s).ok())
        {
            self.max_queue_size = v;
        }
        if let Some(v) = env::var(OTEL_BSP_MAX_EXPORT_BATCH_SIZE)
            .ok()
            .and_then(|s| usize::from_str(&s).ok())
        {
            self.max_export_batch_size = v;
        }
        if let Some(v) = env::var(OTEL_BSP_SCHEDULE_DELAY)
            .ok()
            .and_then(|s| u64::from_str(&s).ok())
        {
            self.scheduled_delay = Duration::from_millis(v);
        }
        if let Some(v) = env::var(OTEL_BSP_EXPORT_TIMEOUT)
            .ok()
            .and_then(|s| u64::from_str(&s).ok())
        {
            self.max_export_timeout = Duration::from_millis(v);
        }
        self
    }
}

enum Message {
    Span(FinishedSpan),
    Tick,
    ForceFlush(oneshot::Sender<ExportResult>),
    Shutdown(oneshot::Sender<ExportResult>),
    SetResource(Resource),
}

/// Buffers finished, sampled spans in a bounded FIFO and hands fixed-size
/// batches to an exporter on a schedule (spec.md §4.1).
pub struct BatchSpanProcessor {
    message_sender: mpsc::UnboundedSender<Message>,
    is_shutdown: Arc<AtomicBool>,
}

impl std::fmt::Debug for BatchSpanProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSpanProcessor").finish()
    }
}

impl BatchSpanProcessor {
    pub fn new(exporter: Arc<dyn SpanExporter>, config: BatchConfig) -> Self {
        Self::with_clock(exporter, config, SystemClock)
    }

    pub fn with_clock<C: Clock>(
        exporter: Arc<dyn SpanExporter>,
        config: BatchConfig,
        clock: C,
    ) -> Self {
        let (message_sender, message_receiver) = mpsc::unbounded_channel();
        let is_shutdown = Arc::new(AtomicBool::new(false));
        let is_shutdown_task = is_shutdown.clone();

        tokio::spawn(async move {
            let ticker = clock.interval(config.scheduled_delay).map(|_| Message::Tick);
            let mut messages =
                Box::pin(stream::select(UnboundedReceiverStream::new(message_receiver), ticker));

            let mut buffer: Vec<FinishedSpan> = Vec::new();
            let mut resource = Resource::default();
            let scope = InstrumentationScope::pipeline();
            let mut batch_id: u64 = 0;
            let mut dropped: u64 = 0;

            while let Some(message) = messages.next().await {
                match message {
                    Message::Span(span) => {
                        if buffer.len() >= config.max_queue_size {
                            dropped += 1;
                        } else {
                            buffer.push(span);
                            if buffer.len() >= config.max_queue_size {
                                tick(
                                    &mut buffer,
                                    &mut batch_id,
                                    &mut dropped,
                                    &config,
                                    &clock,
                                    exporter.as_ref(),
                                    &resource,
                                    &scope,
                                )
                                .await;
                            }
                        }
                    }
                    Message::Tick => {
                        tick(
                            &mut buffer,
                            &mut batch_id,
                            &mut dropped,
                            &config,
                            &clock,
                            exporter.as_ref(),
                            &resource,
                            &scope,
                        )
                        .await;
                    }
                    Message::ForceFlush(reply) => {
                        let result = force_flush_buffer(
                            &mut buffer,
                            &config,
                            &clock,
                            exporter.as_ref(),
                            &resource,
                            &scope,
                        )
                        .await;
                        let _ = reply.send(result);
                    }
                    Message::Shutdown(reply) => {
                        let result = force_flush_buffer(
                            &mut buffer,
                            &config,
                            &clock,
                            exporter.as_ref(),
                            &resource,
                            &scope,
                        )
                        .await;
                        exporter.shutdown().await;
                        is_shutdown_task.store(true, Ordering::SeqCst);
                        let _ = reply.send(result);
                        break;
                    }
                    Message::SetResource(r) => {
                        resource = r;
                        exporter.set_resource(&resource);
                    }
                }
            }
        });

        BatchSpanProcessor {
            message_sender,
            is_shutdown,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::SeqCst)
    }
}

#[allow(clippy::too_many_arguments)]
async fn tick<C: Clock>(
    buffer: &mut Vec<FinishedSpan>,
    batch_id: &mut u64,
    dropped: &mut u64,
    config: &BatchConfig,
    clock: &C,
    exporter: &dyn SpanExporter,
    resource: &Resource,
    scope: &InstrumentationScope,
) {
    if buffer.is_empty() {
        return;
    }
    if *dropped > 0 {
        otel_warn!(name: "batch_span_processor.dropped_spans", dropped_count = *dropped);
        *dropped = 0;
    }

    let take = min(config.max_export_batch_size, buffer.len());
    let batch: Vec<FinishedSpan> = buffer.drain(..take).collect();
    *batch_id += 1;
    otel_debug!(name: "batch_span_processor.export", batch_id = *batch_id, size = batch.len());

    let export = exporter.export(SpanBatch {
        spans: batch,
        resource: resource.clone(),
        scope: scope.clone(),
    });
    let result = with_timeout(config.max_export_timeout, clock, export).await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            otel_warn!(name: "batch_span_processor.export_failed", error = format!("{err}"));
        }
        Err(_) => {
            otel_warn!(name: "batch_span_processor.export_timed_out", timeout_ms = config.max_export_timeout.as_millis() as u64);
        }
    }
}

async fn force_flush_buffer<C: Clock>(
    buffer: &mut Vec<FinishedSpan>,
    config: &BatchConfig,
    clock: &C,
    exporter: &dyn SpanExporter,
    resource: &Resource,
    scope: &InstrumentationScope,
) -> ExportResult {
    if buffer.is_empty() {
        otel_debug!(name: "batch_span_processor.force_flush_noop");
        return exporter.force_flush().await;
    }

    let chunks: Vec<Vec<FinishedSpan>> = buffer
        .drain(..)
        .collect::<Vec<_>>()
        .chunks(config.max_export_batch_size)
        .map(|c| c.to_vec())
        .collect();

    let exports = chunks.into_iter().map(|chunk| {
        exporter.export(SpanBatch {
            spans: chunk,
            resource: resource.clone(),
            scope: scope.clone(),
        })
    });

    let aggregate = futures_util::future::join_all(exports);
    let result = with_timeout(config.max_export_timeout, clock, aggregate).await;

    let export_result = match result {
        Ok(results) => results.into_iter().find(|r| r.is_err()).unwrap_or(Ok(())),
        Err(_) => Err(ExportError::TimedOut(config.max_export_timeout)),
    };

    let _ = exporter.force_flush().await;
    export_result
}

impl SpanProcessor for BatchSpanProcessor {
    fn on_end(&self, span: FinishedSpan) {
        if !span.is_sampled() {
            return;
        }
        let _ = self.message_sender.send(Message::Span(span));
    }

    fn force_flush(&self) -> BoxFuture<'static, ExportResult> {
        let sender = self.message_sender.clone();
        Box::pin(async move {
            let (tx, rx) = oneshot::channel();
            if sender.send(Message::ForceFlush(tx)).is_err() {
                return Ok(());
            }
            rx.await.unwrap_or(Ok(()))
        })
    }

    fn shutdown(&self) -> BoxFuture<'static, ExportResult> {
        let sender = self.message_sender.clone();
        Box::pin(async move {
            let (tx, rx) = oneshot::channel();
            if sender.send(Message::Shutdown(tx)).is_err() {
                // Already shut down: idempotent no-op.
                return Ok(());
            }
            rx.await.unwrap_or(Ok(()))
        })
    }

    fn set_resource(&self, resource: Resource) {
        let _ = self.message_sender.send(Message::SetResource(resource));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::resource::InstrumentationScope;
    use crate::trace::{SpanContext, SpanId, SpanKind, Status, TraceFlags, TraceId};
    use std::sync::Mutex as StdMutex;

    fn sampled_span(name: &'static str) -> FinishedSpan {
        FinishedSpan {
            span_context: SpanContext {
                trace_id: TraceId([1; 16]),
                span_id: SpanId([2; 8]),
                trace_flags: TraceFlags(0x01),
            },
            parent_span_id: None,
            name: name.into(),
            kind: SpanKind::Internal,
            status: Status::Unset,
            start_time_unix_nanos: 0,
            end_time_unix_nanos: 1,
            attributes: Vec::new(),
            events: Vec::new(),
            links: Vec::new(),
            resource: Resource::default(),
        }
    }

    fn unsampled_span(name: &'static str) -> FinishedSpan {
        let mut s = sampled_span(name);
        s.span_context.trace_flags = TraceFlags(0x00);
        s
    }

    #[derive(Debug, Default)]
    struct RecordingExporter {
        batches: StdMutex<Vec<Vec<String>>>,
    }

    impl SpanExporter for RecordingExporter {
        fn export(&self, batch: SpanBatch) -> BoxFuture<'static, ExportResult> {
            let names: Vec<String> = batch.spans.iter().map(|s| s.name.to_string()).collect();
            self.batches.lock().unwrap().push(names);
            Box::pin(async { Ok(()) })
        }

        fn shutdown(&self) -> BoxFuture<'static, ()> {
            Box::pin(async {})
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tick_driven_export_preserves_order() {
        let exporter = Arc::new(RecordingExporter::default());
        let clock = TestClock::new();
        let config = BatchConfigBuilder::default()
            .with_scheduled_delay(Duration::from_secs(2))
            .with_max_queue_size(2048)
            .with_max_export_batch_size(512)
            .build();
        let processor = BatchSpanProcessor::with_clock(exporter.clone(), config, clock.clone());

        processor.on_end(sampled_span("1"));
        processor.on_end(sampled_span("2"));
        processor.on_end(sampled_span("3"));

        clock.advance(Duration::from_secs(2));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let batches = exporter.batches.lock().unwrap().clone();
        assert_eq!(batches, vec![vec!["1", "2", "3"]]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unsampled_spans_are_filtered() {
        let exporter = Arc::new(RecordingExporter::default());
        let clock = TestClock::new();
        let config = BatchConfigBuilder::default()
            .with_scheduled_delay(Duration::from_secs(2))
            .build();
        let processor = BatchSpanProcessor::with_clock(exporter.clone(), config, clock.clone());

        processor.on_end(sampled_span("1"));
        processor.on_end(unsampled_span("2"));

        clock.advance(Duration::from_secs(2));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let batches = exporter.batches.lock().unwrap().clone();
        assert_eq!(batches, vec![vec!["1"]]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn queue_full_triggers_immediate_export() {
        let exporter = Arc::new(RecordingExporter::default());
        let clock = TestClock::new();
        let config = BatchConfigBuilder::default()
            .with_scheduled_delay(Duration::from_secs(2))
            .with_max_queue_size(3)
            .build();
        let processor = BatchSpanProcessor::with_clock(exporter.clone(), config, clock.clone());

        processor.on_end(sampled_span("1"));
        processor.on_end(sampled_span("2"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(exporter.batches.lock().unwrap().is_empty());

        processor.on_end(sampled_span("3"));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let batches = exporter.batches.lock().unwrap().clone();
        assert_eq!(batches, vec![vec!["1", "2", "3"]]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn force_flush_on_empty_buffer_is_noop() {
        let exporter = Arc::new(RecordingExporter::default());
        let config = BatchConfig::default();
        let processor = BatchSpanProcessor::new(exporter.clone(), config);
        processor.force_flush().await.unwrap();
        assert!(exporter.batches.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_is_idempotent() {
        let exporter = Arc::new(RecordingExporter::default());
        let config = BatchConfig::default();
        let processor = BatchSpanProcessor::new(exporter.clone(), config);
        processor.shutdown().await.unwrap();
        processor.shutdown().await.unwrap();
        assert!(processor.is_shutdown());
    }
}
