//! Log record data model (spec.md §3).

mod export;
mod processor;

pub use export::{ExportResult, LogBatch, LogExporter};
pub use processor::{
    BatchConfig, BatchConfigBuilder, BatchLogProcessor, LogProcessor, SimpleLogProcessor,
};

use crate::resource::Resource;
use crate::trace::SpanContext;
use crate::value::{KeyValue, Value};
use std::borrow::Cow;

/// Log severity, mapped to an OTLP severity number on export.
///
/// The OTLP severity-number space reserves four slots per level
/// (`TRACE`=1..4, `DEBUG`=5..8, `INFO`=9..12, `WARN`=13..16,
/// `ERROR`=17..20, `FATAL`=21..24) so bridges from richer level systems
/// can sub-rank within a level. `Notice` sits above `Info` (slot 10,
/// `INFO3`) and `Critical` sits at `FATAL` (slot 21), since neither has a
/// dedicated OTLP name of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn otlp_severity_number(&self) -> i32 {
        match self {
            Severity::Trace => 1,
            Severity::Debug => 5,
            Severity::Info => 9,
            Severity::Notice => 10,
            Severity::Warning => 13,
            Severity::Error => 17,
            Severity::Critical => 21,
        }
    }
}

/// A single log event (spec.md §3).
///
/// `timestamp_unix_nanos` doubles as the observed-time field: the spec
/// requires the two to be equal, so there is only one field here rather
/// than two that must be kept in sync.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub body: Option<Value>,
    pub severity: Severity,
    pub timestamp_unix_nanos: u64,
    pub attributes: Vec<KeyValue>,
    pub resource: Resource,
    pub span_context: Option<SpanContext>,
    pub event_name: Option<Cow<'static, str>>,
}
