//! Conversion from `otel-sdk`'s in-memory data model to the generated
//! OTLP protobuf messages (spec.md §6: "one `Export*ServiceRequest`
//! containing one `Resource*` wrapper, containing one scope-wrapper").

pub mod logs;
pub mod metrics;
pub mod trace;

use opentelemetry_proto::tonic::common::v1::{
    any_value, AnyValue, InstrumentationScope as ProtoScope, KeyValue as ProtoKeyValue,
};
use opentelemetry_proto::tonic::resource::v1::Resource as ProtoResource;
use otel_sdk::resource::{InstrumentationScope, Resource};
use otel_sdk::value::{Array, KeyValue, Value};

pub(crate) fn to_proto_resource(resource: &Resource) -> ProtoResource {
    ProtoResource {
        attributes: resource
            .iter()
            .map(|(k, v)| to_proto_kv(k, v))
            .collect(),
        dropped_attributes_count: 0,
    }
}

pub(crate) fn to_proto_scope(scope: &InstrumentationScope) -> ProtoScope {
    ProtoScope {
        name: scope.name.to_string(),
        version: scope.version.to_string(),
        attributes: scope
            .attributes
            .iter()
            .map(|(k, v)| to_proto_kv(k, &Value::String((*v).to_string().into())))
            .collect(),
        dropped_attributes_count: 0,
    }
}

pub(crate) fn to_proto_kv(key: &str, value: &Value) -> ProtoKeyValue {
    ProtoKeyValue {
        key: key.to_string(),
        value: Some(to_any_value(value)),
    }
}

pub(crate) fn key_value_to_proto(kv: &KeyValue) -> ProtoKeyValue {
    to_proto_kv(&kv.key, &kv.value)
}

pub(crate) fn to_any_value_pub(value: &Value) -> AnyValue {
    to_any_value(value)
}

fn to_any_value(value: &Value) -> AnyValue {
    let value = match value {
        Value::String(s) => any_value::Value::StringValue(s.to_string()),
        Value::Bool(b) => any_value::Value::BoolValue(*b),
        Value::Int64(i) => any_value::Value::IntValue(*i),
        Value::Float64(f) => any_value::Value::DoubleValue(*f),
        Value::Array(array) => any_value::Value::ArrayValue(opentelemetry_proto::tonic::common::v1::ArrayValue {
            values: array_to_any_values(array),
        }),
    };
    AnyValue { value: Some(value) }
}

fn array_to_any_values(array: &Array) -> Vec<AnyValue> {
    match array {
        Array::String(items) => items
            .iter()
            .map(|s| AnyValue {
                value: Some(any_value::Value::StringValue(s.to_string())),
            })
            .collect(),
        Array::Bool(items) => items
            .iter()
            .map(|b| AnyValue {
                value: Some(any_value::Value::BoolValue(*b)),
            })
            .collect(),
        Array::Int64(items) => items
            .iter()
            .map(|i| AnyValue {
                value: Some(any_value::Value::IntValue(*i)),
            })
            .collect(),
        Array::Float64(items) => items
            .iter()
            .map(|f| AnyValue {
                value: Some(any_value::Value::DoubleValue(*f)),
            })
            .collect(),
    }
}
