use super::{key_value_to_proto, to_any_value_pub, to_proto_resource};
use opentelemetry_proto::tonic::logs::v1::{
    LogRecord as ProtoLogRecord, ResourceLogs, ScopeLogs, SeverityNumber,
};
use otel_sdk::logs::LogRecord;
use otel_sdk::resource::Resource;

pub fn records_to_resource_logs(
    records: Vec<LogRecord>,
    resource: &Resource,
    scope_name: &str,
    scope_version: &str,
) -> Vec<ResourceLogs> {
    if records.is_empty() {
        return Vec::new();
    }
    let scope = opentelemetry_proto::tonic::common::v1::InstrumentationScope {
        name: scope_name.to_string(),
        version: scope_version.to_string(),
        attributes: Vec::new(),
        dropped_attributes_count: 0,
    };
    vec![ResourceLogs {
        resource: Some(to_proto_resource(resource)),
        scope_logs: vec![ScopeLogs {
            scope: Some(scope),
            log_records: records.into_iter().map(to_proto_log_record).collect(),
            schema_url: resource.schema_url().unwrap_or_default().to_string(),
        }],
        schema_url: resource.schema_url().unwrap_or_default().to_string(),
    }]
}

fn to_proto_log_record(record: LogRecord) -> ProtoLogRecord {
    let severity_number = record.severity.otlp_severity_number();
    ProtoLogRecord {
        time_unix_nano: record.timestamp_unix_nanos,
        observed_time_unix_nano: record.timestamp_unix_nanos,
        severity_number: to_proto_severity(severity_number) as i32,
        severity_text: String::new(),
        body: record.body.as_ref().map(to_any_value_pub),
        attributes: record.attributes.iter().map(key_value_to_proto).collect(),
        dropped_attributes_count: 0,
        flags: record
            .span_context
            .as_ref()
            .map(|ctx| ctx.trace_flags.0 as u32)
            .unwrap_or(0),
        trace_id: record
            .span_context
            .as_ref()
            .map(|ctx| ctx.trace_id.0.to_vec())
            .unwrap_or_default(),
        span_id: record
            .span_context
            .as_ref()
            .map(|ctx| ctx.span_id.0.to_vec())
            .unwrap_or_default(),
        event_name: record.event_name.map(|n| n.to_string()).unwrap_or_default(),
    }
}

fn to_proto_severity(number: i32) -> SeverityNumber {
    match number {
        1 => SeverityNumber::Trace,
        5 => SeverityNumber::Debug,
        9 => SeverityNumber::Info,
        10 => SeverityNumber::Info3,
        13 => SeverityNumber::Warn,
        17 => SeverityNumber::Error,
        21 => SeverityNumber::Fatal,
        _ => SeverityNumber::Unspecified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otel_sdk::logs::Severity;
    use otel_sdk::value::Value;

    fn record() -> LogRecord {
        LogRecord {
            body: Some(Value::String("hello".into())),
            severity: Severity::Warning,
            timestamp_unix_nanos: 42,
            attributes: Vec::new(),
            resource: Resource::default(),
            span_context: None,
            event_name: None,
        }
    }

    #[test]
    fn timestamp_and_observed_time_are_equal() {
        let resource = Resource::default();
        let result = records_to_resource_logs(vec![record()], &resource, "swift-otel", "0.1.0");
        let log_record = &result[0].scope_logs[0].log_records[0];
        assert_eq!(log_record.time_unix_nano, log_record.observed_time_unix_nano);
    }

    #[test]
    fn severity_maps_to_otlp_warn() {
        let resource = Resource::default();
        let result = records_to_resource_logs(vec![record()], &resource, "swift-otel", "0.1.0");
        assert_eq!(
            result[0].scope_logs[0].log_records[0].severity_number,
            SeverityNumber::Warn as i32
        );
    }
}
