use super::{key_value_to_proto, to_proto_resource};
use opentelemetry_proto::tonic::trace::v1::{
    span::{Event as ProtoEvent, Link as ProtoLink, SpanKind as ProtoSpanKind},
    status::StatusCode,
    ResourceSpans, ScopeSpans, Span as ProtoSpan, Status as ProtoStatus,
};
use otel_sdk::resource::Resource;
use otel_sdk::trace::{FinishedSpan, SpanKind, Status};

/// Groups a flat batch into the single resource/scope wrapper every
/// export carries exactly one of (spec.md §3, §6).
pub fn spans_to_resource_spans(
    spans: Vec<FinishedSpan>,
    resource: &Resource,
    scope_name: &str,
    scope_version: &str,
) -> Vec<ResourceSpans> {
    if spans.is_empty() {
        return Vec::new();
    }
    let scope = opentelemetry_proto::tonic::common::v1::InstrumentationScope {
        name: scope_name.to_string(),
        version: scope_version.to_string(),
        attributes: Vec::new(),
        dropped_attributes_count: 0,
    };
    vec![ResourceSpans {
        resource: Some(to_proto_resource(resource)),
        scope_spans: vec![ScopeSpans {
            scope: Some(scope),
            spans: spans.into_iter().map(to_proto_span).collect(),
            schema_url: resource.schema_url().unwrap_or_default().to_string(),
        }],
        schema_url: resource.schema_url().unwrap_or_default().to_string(),
    }]
}

fn to_proto_span(span: FinishedSpan) -> ProtoSpan {
    ProtoSpan {
        trace_id: span.span_context.trace_id.0.to_vec(),
        span_id: span.span_context.span_id.0.to_vec(),
        trace_state: String::new(),
        parent_span_id: span
            .parent_span_id
            .map(|id| id.0.to_vec())
            .unwrap_or_default(),
        flags: span.span_context.trace_flags.0 as u32,
        name: span.name.to_string(),
        kind: to_proto_kind(span.kind) as i32,
        start_time_unix_nano: span.start_time_unix_nanos,
        end_time_unix_nano: span.end_time_unix_nanos,
        attributes: span.attributes.iter().map(key_value_to_proto).collect(),
        dropped_attributes_count: 0,
        events: span.events.into_iter().map(to_proto_event).collect(),
        dropped_events_count: 0,
        links: span.links.into_iter().map(to_proto_link).collect(),
        dropped_links_count: 0,
        status: Some(to_proto_status(&span.status)),
    }
}

fn to_proto_kind(kind: SpanKind) -> ProtoSpanKind {
    match kind {
        SpanKind::Internal => ProtoSpanKind::Internal,
        SpanKind::Server => ProtoSpanKind::Server,
        SpanKind::Client => ProtoSpanKind::Client,
        SpanKind::Producer => ProtoSpanKind::Producer,
        SpanKind::Consumer => ProtoSpanKind::Consumer,
    }
}

fn to_proto_status(status: &Status) -> ProtoStatus {
    match status {
        Status::Unset => ProtoStatus {
            code: StatusCode::Unset as i32,
            message: String::new(),
        },
        Status::Ok => ProtoStatus {
            code: StatusCode::Ok as i32,
            message: String::new(),
        },
        Status::Error { message } => ProtoStatus {
            code: StatusCode::Error as i32,
            message: message.clone().unwrap_or_default().to_string(),
        },
    }
}

fn to_proto_event(event: otel_sdk::trace::SpanEvent) -> ProtoEvent {
    ProtoEvent {
        time_unix_nano: event.timestamp_nanos,
        name: event.name.to_string(),
        attributes: event.attributes.iter().map(key_value_to_proto).collect(),
        dropped_attributes_count: 0,
    }
}

fn to_proto_link(link: otel_sdk::trace::SpanLink) -> ProtoLink {
    ProtoLink {
        trace_id: link.span_context.trace_id.0.to_vec(),
        span_id: link.span_context.span_id.0.to_vec(),
        trace_state: String::new(),
        attributes: link.attributes.iter().map(key_value_to_proto).collect(),
        dropped_attributes_count: 0,
        flags: link.span_context.trace_flags.0 as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otel_sdk::trace::{SpanContext, SpanId, SpanKind as Kind, TraceFlags, TraceId};

    fn span() -> FinishedSpan {
        FinishedSpan {
            span_context: SpanContext {
                trace_id: TraceId([1; 16]),
                span_id: SpanId([2; 8]),
                trace_flags: TraceFlags(1),
            },
            parent_span_id: None,
            name: "op".into(),
            kind: Kind::Server,
            status: Status::Ok,
            start_time_unix_nanos: 100,
            end_time_unix_nanos: 200,
            attributes: Vec::new(),
            events: Vec::new(),
            links: Vec::new(),
            resource: Resource::default(),
        }
    }

    #[test]
    fn wraps_spans_in_single_resource_and_scope() {
        let resource = Resource::default();
        let result = spans_to_resource_spans(vec![span()], &resource, "swift-otel", "0.1.0");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].scope_spans.len(), 1);
        assert_eq!(result[0].scope_spans[0].spans.len(), 1);
        assert_eq!(result[0].scope_spans[0].spans[0].name, "op");
    }

    #[test]
    fn empty_batch_produces_no_resource_spans() {
        let resource = Resource::default();
        assert!(spans_to_resource_spans(Vec::new(), &resource, "swift-otel", "0.1.0").is_empty());
    }
}
