//! Metric data model (spec.md §3, §4.3).

mod reader;

pub use reader::{PeriodicMetricsReader, PeriodicReaderBuilder};

use crate::resource::{InstrumentationScope, Resource};
use crate::value::KeyValue;
use futures_util::future::BoxFuture;
use std::borrow::Cow;

pub use crate::error::ExportResult;

/// Cumulative-vs-delta aggregation selection, passed through untouched
/// from the producer (which is out of scope here) to the exporter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Temporality {
    Cumulative,
    Delta,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataPoint {
    pub timestamp_unix_nanos: u64,
    pub start_time_unix_nanos: u64,
    pub attributes: Vec<KeyValue>,
    pub value: DataPointValue,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DataPointValue {
    Int(i64),
    Float(f64),
    Histogram {
        count: u64,
        sum: f64,
        bucket_counts: Vec<u64>,
        explicit_bounds: Vec<f64>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum MetricPoint {
    Counter {
        name: Cow<'static, str>,
        unit: Cow<'static, str>,
        temporality: Temporality,
        data_points: Vec<DataPoint>,
    },
    Gauge {
        name: Cow<'static, str>,
        unit: Cow<'static, str>,
        data_points: Vec<DataPoint>,
    },
    Histogram {
        name: Cow<'static, str>,
        unit: Cow<'static, str>,
        temporality: Temporality,
        data_points: Vec<DataPoint>,
    },
}

/// One instrumentation scope's worth of metric points.
#[derive(Clone, Debug, PartialEq)]
pub struct ScopeMetrics {
    pub scope: InstrumentationScope,
    pub metrics: Vec<MetricPoint>,
}

/// A single tick's snapshot, ready for export (spec.md §3).
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceMetrics {
    pub resource: Resource,
    pub scope_metrics: Vec<ScopeMetrics>,
}

/// The out-of-scope live producer the reader pulls from every tick. The
/// producer itself IS the buffer: the reader holds no state of its own.
pub trait MetricsProducer: Send + Sync + std::fmt::Debug {
    fn produce(&self) -> Vec<MetricPoint>;
}

pub trait MetricsExporter: Send + Sync + std::fmt::Debug {
    fn export(&self, metrics: ResourceMetrics) -> BoxFuture<'static, ExportResult>;

    fn force_flush(&self) -> BoxFuture<'static, ExportResult> {
        Box::pin(async { Ok(()) })
    }

    fn shutdown(&self) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    fn set_resource(&self, _resource: &Resource) {}
}
