use super::export::{ExportResult, LogBatch, LogExporter};
use super::LogRecord;
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

const OTEL_BLRP_SCHEDULE_DELAY: &str = "OTEL_BLRP_SCHEDULE_DELAY";
const OTEL_BLRP_SCHEDULE_DELAY_DEFAULT: u64 = 1_000;
const OTEL_BLRP_EXPORT_TIMEOUT: &str = "OTEL_BLRP_EXPORT_TIMEOUT";
const OTEL_BLRP_EXPORT_TIMEOUT_DEFAULT: u64 = 30_000;
const OTEL_BLRP_MAX_QUEUE_SIZE: &str = "OTEL_BLRP_MAX_QUEUE_SIZE";
const OTEL_BLRP_MAX_QUEUE_SIZE_DEFAULT: usize = 2_048;
const OTEL_BLRP_MAX_EXPORT_BATCH_SIZE: &str = "OTEL_BLRP_MAX_EXPORT_BATCH_SIZE";
const OTEL_BLRP_MAX_EXPORT_BATCH_SIZE_DEFAULT: usize = 512;

pub trait LogProcessor: Send + Sync + std::fmt::Debug {
    fn emit(&self, record: LogRecord);
    fn force_flush(&self) -> BoxFuture<'static, ExportResult>;
    fn shutdown(&self) -> BoxFuture<'static, ExportResult>;
    fn set_resource(&self, resource: Resource);
}

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
    /// Defaults overridden by `OTEL_BLRP_*` env vars if set:
    /// * `OTEL_BLRP_MAX_QUEUE_SIZE` (2048)
    /// * `OTEL_BLRP_SCHEDULE_DELAY` (1000ms)
    /// * `OTEL_BLRP_MAX_EXPORT_BATCH_SIZE` (512)
    /// * `OTEL_BLRP_EXPORT_TIMEOUT` (30000ms)
    fn default() -> Self {
        BatchConfigBuilder {
            max_queue_size: OTEL_BLRP_MAX_QUEUE_SIZE_DEFAULT,
            scheduled_delay: Duration::from_millis(OTEL_BLRP_SCHEDULE_DELAY_DEFAULT),
            max_export_batch_size: OTEL_BLRP_MAX_EXPORT_BATCH_SIZE_DEFAULT,
            max_export_timeout: Duration::from_millis(OTEL_BLRP_EXPORT_TIMEOUT_DEFAULT),
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
        if let Some(v) = env::var(OTEL_BLRP_MAX_QUEUE_SIZE)
            .ok()
            .and_then(|s| usize::from_str(&s).ok())
        {
            self.max_queue_size = v;
        }
        if let Some(v) = env::var(OTEL_BLRP_MAX_EXPORT_BATCH_SIZE)
            .ok()
            .and_then(|s| usize::from_str(&s).ok())
        {
            self.max_export_batch_size = v;
        }
        if let Some(v) = env::var(OTEL_BLRP_SCHEDULE_DELAY)
            .ok()
            .and_then(|s| u64::from_str(&s).ok())
        {
            self.scheduled_delay = Duration::from_millis(v);
        }
        if let Some(v) = env::var(OTEL_BLRP_EXPORT_TIMEOUT)
            .ok()
            .and_then(|s| u64::from_str(&s).ok())
        {
            self.max_export_timeout = Duration::from_millis(v);
        }
        self
    }
}

enum Message {
    Record(LogRecord),
    Tick,
    ForceFlush(oneshot::Sender<ExportResult>),
    Shutdown(oneshot::Sender<ExportResult>),
    SetResource(Resource),
}

/// Buffers log records in a bounded FIFO and exports them on a schedule
/// (spec.md §4.2). Unlike [`crate::trace::BatchSpanProcessor`], a full
/// buffer never triggers an early export — only the timer does; overflow
/// is pure drop.
pub struct BatchLogProcessor {
    message_sender: mpsc::UnboundedSender<Message>,
    is_shutdown: Arc<AtomicBool>,
}

impl std::fmt::Debug for BatchLogProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchLogProcessor").finish()
    }
}

impl BatchLogProcessor {
    pub fn new(exporter: Arc<dyn LogExporter>, config: BatchConfig) -> Self {
        Self::with_clock(exporter, config, SystemClock)
    }

    pub fn with_clock<C: Clock>(exporter: Arc<dyn LogExporter>, config: BatchConfig, clock: C) -> Self {
        let (message_sender, message_receiver) = mpsc::unbounded_channel();
        let is_shutdown = Arc::new(AtomicBool::new(false));
        let is_shutdown_task = is_shutdown.clone();

        tokio::spawn(async move {
            let ticker = clock.interval(config.scheduled_delay).map(|_| Message::Tick);
            let mut messages =
                Box::pin(stream::select(UnboundedReceiverStream::new(message_receiver), ticker));

            let mut buffer: Vec<LogRecord> = Vec::new();
            let mut resource = Resource::default();
            let scope = InstrumentationScope::pipeline();
            let mut dropped: u64 = 0;

            while let Some(message) = messages.next().await {
                match message {
                    Message::Record(record) => {
                        if buffer.len() >= config.max_queue_size {
                            dropped += 1;
                        } else {
                            buffer.push(record);
                        }
                    }
                    Message::Tick => {
                        tick(&mut buffer, &mut dropped, &config, &clock, exporter.as_ref(), &resource, &scope).await;
                    }
                    Message::ForceFlush(reply) => {
                        let result = force_flush_buffer(&mut buffer, &config, &clock, exporter.as_ref(), &resource, &scope).await;
                        let _ = reply.send(result);
                    }
                    Message::Shutdown(reply) => {
                        let result = force_flush_buffer(&mut buffer, &config, &clock, exporter.as_ref(), &resource, &scope).await;
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

        BatchLogProcessor {
            message_sender,
            is_shutdown,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::SeqCst)
    }
}

async fn tick<C: Clock>(
    buffer: &mut Vec<LogRecord>,
    dropped: &mut u64,
    config: &BatchConfig,
    clock: &C,
    exporter: &dyn LogExporter,
    resource: &Resource,
    scope: &InstrumentationScope,
) {
    if *dropped > 0 {
        otel_warn!(name: "batch_log_processor.dropped_records", dropped_count = *dropped);
        *dropped = 0;
    }
    if buffer.is_empty() {
        return;
    }

    let take = min(config.max_export_batch_size, buffer.len());
    let batch: Vec<LogRecord> = buffer.drain(..take).collect();
    otel_debug!(name: "batch_log_processor.export", size = batch.len());

    let export = exporter.export(LogBatch {
        records: batch,
        resource: resource.clone(),
        scope: scope.clone(),
    });
    match with_timeout(config.max_export_timeout, clock, export).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            otel_warn!(name: "batch_log_processor.export_failed", error = format!("{err}"));
        }
        Err(_) => {
            otel_warn!(name: "batch_log_processor.export_timed_out", timeout_ms = config.max_export_timeout.as_millis() as u64);
        }
    }
}

async fn force_flush_buffer<C: Clock>(
    buffer: &mut Vec<LogRecord>,
    config: &BatchConfig,
    clock: &C,
    exporter: &dyn LogExporter,
    resource: &Resource,
    scope: &InstrumentationScope,
) -> ExportResult {
    if buffer.is_empty() {
        otel_debug!(name: "batch_log_processor.force_flush_noop");
        return exporter.force_flush().await;
    }

    let chunks: Vec<Vec<LogRecord>> = buffer
        .drain(..)
        .collect::<Vec<_>>()
        .chunks(config.max_export_batch_size)
        .map(|c| c.to_vec())
        .collect();

    let exports = chunks.into_iter().map(|chunk| {
        exporter.export(LogBatch {
            records: chunk,
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

impl LogProcessor for BatchLogProcessor {
    fn emit(&self, record: LogRecord) {
        let _ = self.message_sender.send(Message::Record(record));
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
                return Ok(());
            }
            rx.await.unwrap_or(Ok(()))
        })
    }

    fn set_resource(&self, resource: Resource) {
        let _ = self.message_sender.send(Message::SetResource(resource));
    }
}

/// Pass-through processor used for `console`/`none` exporters: one record
/// at a time, no batching, no retry, no drop accounting (spec.md §4.4).
pub struct SimpleLogProcessor {
    message_sender: mpsc::UnboundedSender<LogRecord>,
    is_shutdown: Arc<AtomicBool>,
    shutdown_sender: Arc<std::sync::Mutex<Option<oneshot::Sender<()>>>>,
}

impl std::fmt::Debug for SimpleLogProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleLogProcessor").finish()
    }
}

impl SimpleLogProcessor {
    pub fn new(exporter: Arc<dyn LogExporter>) -> Self {
        let (message_sender, message_receiver) = mpsc::unbounded_channel::<LogRecord>();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let is_shutdown = Arc::new(AtomicBool::new(false));

        tokio::spawn(async move {
            let mut records = UnboundedReceiverStream::new(message_receiver);
            let scope = InstrumentationScope::pipeline();
            loop {
                tokio::select! {
                    record = records.next() => {
                        match record {
                            Some(record) => {
                                let resource = record.resource.clone();
                                let export = exporter.export(LogBatch {
                                    records: vec![record],
                                    resource,
                                    scope: scope.clone(),
                                });
                                if let Err(err) = export.await {
                                    otel_warn!(name: "simple_log_processor.export_failed", error = format!("{err}"));
                                }
                            }
                            None => break,
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
            exporter.shutdown().await;
        });

        SimpleLogProcessor {
            message_sender,
            is_shutdown,
            shutdown_sender: Arc::new(std::sync::Mutex::new(Some(shutdown_tx))),
        }
    }
}

impl LogProcessor for SimpleLogProcessor {
    fn emit(&self, record: LogRecord) {
        if self.is_shutdown.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.message_sender.send(record);
    }

    fn force_flush(&self) -> BoxFuture<'static, ExportResult> {
        Box::pin(async { Ok(()) })
    }

    fn shutdown(&self) -> BoxFuture<'static, ExportResult> {
        self.is_shutdown.store(true, Ordering::SeqCst);
        if let Some(tx) = self.shutdown_sender.lock().unwrap().take() {
            let _ = tx.send(());
        }
        Box::pin(async { Ok(()) })
    }

    fn set_resource(&self, _resource: Resource) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::value::Value;
    use std::sync::Mutex as StdMutex;

    fn record(body: &'static str) -> LogRecord {
        LogRecord {
            body: Some(Value::String(body.into())),
            severity: super::super::Severity::Info,
            timestamp_unix_nanos: 0,
            attributes: Vec::new(),
            resource: Resource::default(),
            span_context: None,
            event_name: None,
        }
    }

    #[derive(Debug, Default)]
    struct SlowRecordingExporter {
        batches: StdMutex<Vec<usize>>,
        delay: Duration,
    }

    impl LogExporter for SlowRecordingExporter {
        fn export(&self, batch: LogBatch) -> BoxFuture<'static, ExportResult> {
            self.batches.lock().unwrap().push(batch.records.len());
            let delay = self.delay;
            Box::pin(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(())
            })
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn overflow_drops_and_reports_once() {
        let exporter = Arc::new(SlowRecordingExporter::default());
        let clock = TestClock::new();
        let config = BatchConfigBuilder::default()
            .with_scheduled_delay(Duration::from_secs(1))
            .with_max_queue_size(2)
            .build();
        let processor = BatchLogProcessor::with_clock(exporter.clone(), config, clock.clone());

        processor.emit(record("1"));
        processor.emit(record("2"));
        processor.emit(record("3")); // dropped: buffer already at capacity

        clock.advance(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let batches = exporter.batches.lock().unwrap().clone();
        assert_eq!(batches, vec![2]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn simple_processor_exports_one_at_a_time() {
        let exporter = Arc::new(SlowRecordingExporter::default());
        let processor = SimpleLogProcessor::new(exporter.clone());

        processor.emit(record("1"));
        processor.emit(record("2"));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(exporter.batches.lock().unwrap().clone(), vec![1, 1]);
        processor.shutdown().await.unwrap();
    }
}
