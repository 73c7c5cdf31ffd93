use super::{ExportResult, MetricsExporter, MetricsProducer, ResourceMetrics, ScopeMetrics};
use crate::clock::{Clock, SystemClock};
use crate::resource::{InstrumentationScope, Resource};
use crate::timeout::with_timeout;
use crate::{otel_debug, otel_warn};
use futures_util::future::BoxFuture;
use futures_util::StreamExt as _;
use std::env;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

const OTEL_METRIC_EXPORT_INTERVAL: &str = "OTEL_METRIC_EXPORT_INTERVAL";
const OTEL_METRIC_EXPORT_INTERVAL_DEFAULT: u64 = 60_000;
const OTEL_METRIC_EXPORT_TIMEOUT: &str = "OTEL_METRIC_EXPORT_TIMEOUT";
const OTEL_METRIC_EXPORT_TIMEOUT_DEFAULT: u64 = 30_000;

#[derive(Debug)]
pub struct PeriodicReaderBuilder {
    interval: Duration,
    timeout: Duration,
}

impl Default for PeriodicReaderBuilder {
    /// Defaults overridden by env vars if set:
    /// * `OTEL_METRIC_EXPORT_INTERVAL` (60000ms)
    /// * `OTEL_METRIC_EXPORT_TIMEOUT` (30000ms)
    fn default() -> Self {
        let mut interval = Duration::from_millis(OTEL_METRIC_EXPORT_INTERVAL_DEFAULT);
        let mut timeout = Duration::from_millis(OTEL_METRIC_EXPORT_TIMEOUT_DEFAULT);
        if let Some(v) = env::var(OTEL_METRIC_EXPORT_INTERVAL)
            .ok()
            .and_then(|s| u64::from_str(&s).ok())
        {
            interval = Duration::from_millis(v);
        }
        if let Some(v) = env::var(OTEL_METRIC_EXPORT_TIMEOUT)
            .ok()
            .and_then(|s| u64::from_str(&s).ok())
        {
            timeout = Duration::from_millis(v);
        }
        PeriodicReaderBuilder { interval, timeout }
    }
}

impl PeriodicReaderBuilder {
    pub fn with_interval(mut self, v: Duration) -> Self {
        self.interval = v;
        self
    }

    pub fn with_timeout(mut self, v: Duration) -> Self {
        self.timeout = v;
        self
    }

    pub fn build(
        self,
        producer: Arc<dyn MetricsProducer>,
        exporter: Arc<dyn MetricsExporter>,
    ) -> PeriodicMetricsReader {
        PeriodicMetricsReader::with_clock(producer, exporter, self.interval, self.timeout, SystemClock)
    }
}

/// Timer-driven pull from a producer; no internal buffer (spec.md §4.3).
/// Unlike the batch processors, the producer itself supplies the next
/// snapshot on every tick, so there is nothing to drop or overflow here.
pub struct PeriodicMetricsReader {
    shutdown_sender: std::sync::Mutex<Option<oneshot::Sender<oneshot::Sender<()>>>>,
    is_shutdown: Arc<AtomicBool>,
}

impl std::fmt::Debug for PeriodicMetricsReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicMetricsReader").finish()
    }
}

impl PeriodicMetricsReader {
    pub fn builder() -> PeriodicReaderBuilder {
        PeriodicReaderBuilder::default()
    }

    pub fn with_clock<C: Clock>(
        producer: Arc<dyn MetricsProducer>,
        exporter: Arc<dyn MetricsExporter>,
        interval: Duration,
        timeout: Duration,
        clock: C,
    ) -> Self {
        let (shutdown_sender, mut shutdown_receiver) =
            oneshot::channel::<oneshot::Sender<()>>();
        let is_shutdown = Arc::new(AtomicBool::new(false));
        let is_shutdown_task = is_shutdown.clone();

        tokio::spawn(async move {
            let mut ticker = clock.interval(interval);
            let resource = Resource::default();
            let scope = InstrumentationScope::pipeline();

            let done_sender = loop {
                tokio::select! {
                    _ = ticker.next() => {
                        export_once(producer.as_ref(), exporter.as_ref(), &clock, timeout, &resource, &scope).await;
                    }
                    result = &mut shutdown_receiver => {
                        break result.ok();
                    }
                }
            };

            export_once(producer.as_ref(), exporter.as_ref(), &clock, timeout, &resource, &scope).await;
            let _ = exporter.force_flush().await;
            exporter.shutdown().await;
            is_shutdown_task.store(true, Ordering::SeqCst);
            if let Some(done_sender) = done_sender {
                let _ = done_sender.send(());
            }
        });

        PeriodicMetricsReader {
            shutdown_sender: std::sync::Mutex::new(Some(shutdown_sender)),
            is_shutdown,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) -> BoxFuture<'static, ()> {
        let sender = self.shutdown_sender.lock().unwrap().take();
        Box::pin(async move {
            let Some(sender) = sender else { return };
            let (done_tx, done_rx) = oneshot::channel();
            if sender.send(done_tx).is_err() {
                return;
            }
            let _ = done_rx.await;
        })
    }
}

async fn export_once<C: Clock>(
    producer: &dyn MetricsProducer,
    exporter: &dyn MetricsExporter,
    clock: &C,
    timeout: Duration,
    resource: &Resource,
    scope: &InstrumentationScope,
) {
    let points = producer.produce();
    if points.is_empty() {
        otel_debug!(name: "periodic_metrics_reader.tick_empty");
        return;
    }

    let metrics = ResourceMetrics {
        resource: resource.clone(),
        scope_metrics: vec![ScopeMetrics {
            scope: scope.clone(),
            metrics: points,
        }],
    };

    let export = exporter.export(metrics);
    let result: Result<ExportResult, _> = with_timeout(timeout, clock, export).await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            otel_warn!(name: "periodic_metrics_reader.export_failed", error = format!("{err}"));
        }
        Err(_) => {
            otel_warn!(name: "periodic_metrics_reader.export_timed_out", timeout_ms = timeout.as_millis() as u64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::metrics::{DataPoint, DataPointValue, MetricPoint, Temporality};
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Default)]
    struct CountingProducer {
        calls: StdMutex<u32>,
    }

    impl MetricsProducer for CountingProducer {
        fn produce(&self) -> Vec<MetricPoint> {
            *self.calls.lock().unwrap() += 1;
            vec![MetricPoint::Counter {
                name: "requests".into(),
                unit: "1".into(),
                temporality: Temporality::Cumulative,
                data_points: vec![DataPoint {
                    timestamp_unix_nanos: 0,
                    start_time_unix_nanos: 0,
                    attributes: Vec::new(),
                    value: DataPointValue::Int(1),
                }],
            }]
        }
    }

    #[derive(Debug, Default)]
    struct RecordingExporter {
        exports: StdMutex<u32>,
    }

    impl MetricsExporter for RecordingExporter {
        fn export(&self, _metrics: ResourceMetrics) -> BoxFuture<'static, ExportResult> {
            *self.exports.lock().unwrap() += 1;
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn exports_on_each_tick() {
        let producer = Arc::new(CountingProducer::default());
        let exporter = Arc::new(RecordingExporter::default());
        let clock = TestClock::new();
        let reader = PeriodicMetricsReader::with_clock(
            producer.clone(),
            exporter.clone(),
            Duration::from_secs(1),
            Duration::from_secs(5),
            clock.clone(),
        );

        clock.advance(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        clock.advance(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(*exporter.exports.lock().unwrap(), 2);
        reader.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_performs_final_tick_then_flush_and_close() {
        let producer = Arc::new(CountingProducer::default());
        let exporter = Arc::new(RecordingExporter::default());
        let clock = TestClock::new();
        let reader = PeriodicMetricsReader::with_clock(
            producer,
            exporter.clone(),
            Duration::from_secs(60),
            Duration::from_secs(5),
            clock,
        );

        reader.shutdown().await;
        assert_eq!(*exporter.exports.lock().unwrap(), 1);
        assert!(reader.is_shutdown());
    }
}
