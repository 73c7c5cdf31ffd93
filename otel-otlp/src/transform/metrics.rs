use super::to_proto_resource;
use opentelemetry_proto::tonic::metrics::v1::{
    metric::Data, number_data_point::Value as NumberValue, AggregationTemporality, Gauge,
    HistogramDataPoint, Metric, NumberDataPoint, ResourceMetrics as ProtoResourceMetrics,
    ScopeMetrics as ProtoScopeMetrics, Sum,
};
use opentelemetry_proto::tonic::metrics::v1::Histogram as ProtoHistogram;
use otel_sdk::metrics::{DataPoint, DataPointValue, MetricPoint, ResourceMetrics, Temporality};
use otel_sdk::value::KeyValue;

pub fn to_proto_resource_metrics(metrics: &ResourceMetrics) -> ProtoResourceMetrics {
    ProtoResourceMetrics {
        resource: Some(to_proto_resource(&metrics.resource)),
        scope_metrics: metrics
            .scope_metrics
            .iter()
            .map(|sm| ProtoScopeMetrics {
                scope: Some(super::to_proto_scope(&sm.scope)),
                metrics: sm.metrics.iter().map(to_proto_metric).collect(),
                schema_url: String::new(),
            })
            .collect(),
        schema_url: metrics.resource.schema_url().unwrap_or_default().to_string(),
    }
}

fn to_proto_temporality(t: Temporality) -> i32 {
    match t {
        Temporality::Cumulative => AggregationTemporality::Cumulative as i32,
        Temporality::Delta => AggregationTemporality::Delta as i32,
    }
}

fn to_proto_metric(point: &MetricPoint) -> Metric {
    match point {
        MetricPoint::Counter {
            name,
            unit,
            temporality,
            data_points,
        } => Metric {
            name: name.to_string(),
            description: String::new(),
            unit: unit.to_string(),
            metadata: Vec::new(),
            data: Some(Data::Sum(Sum {
                data_points: data_points.iter().map(to_proto_number_point).collect(),
                aggregation_temporality: to_proto_temporality(*temporality),
                is_monotonic: true,
            })),
        },
        MetricPoint::Gauge {
            name,
            unit,
            data_points,
        } => Metric {
            name: name.to_string(),
            description: String::new(),
            unit: unit.to_string(),
            metadata: Vec::new(),
            data: Some(Data::Gauge(Gauge {
                data_points: data_points.iter().map(to_proto_number_point).collect(),
            })),
        },
        MetricPoint::Histogram {
            name,
            unit,
            temporality,
            data_points,
        } => Metric {
            name: name.to_string(),
            description: String::new(),
            unit: unit.to_string(),
            metadata: Vec::new(),
            data: Some(Data::Histogram(ProtoHistogram {
                data_points: data_points.iter().map(to_proto_histogram_point).collect(),
                aggregation_temporality: to_proto_temporality(*temporality),
            })),
        },
    }
}

fn to_proto_number_point(point: &DataPoint) -> NumberDataPoint {
    let value = match &point.value {
        DataPointValue::Int(i) => NumberValue::AsInt(*i),
        DataPointValue::Float(f) => NumberValue::AsDouble(*f),
        DataPointValue::Histogram { .. } => NumberValue::AsDouble(0.0),
    };
    NumberDataPoint {
        attributes: point
            .attributes
            .iter()
            .map(to_proto_kv_owned)
            .collect(),
        start_time_unix_nano: point.start_time_unix_nanos,
        time_unix_nano: point.timestamp_unix_nanos,
        exemplars: Vec::new(),
        flags: 0,
        value: Some(value),
    }
}

fn to_proto_histogram_point(point: &DataPoint) -> HistogramDataPoint {
    let (count, sum, bucket_counts, explicit_bounds) = match &point.value {
        DataPointValue::Histogram {
            count,
            sum,
            bucket_counts,
            explicit_bounds,
        } => (*count, *sum, bucket_counts.clone(), explicit_bounds.clone()),
        _ => (0, 0.0, Vec::new(), Vec::new()),
    };
    HistogramDataPoint {
        attributes: point
            .attributes
            .iter()
            .map(to_proto_kv_owned)
            .collect(),
        start_time_unix_nano: point.start_time_unix_nanos,
        time_unix_nano: point.timestamp_unix_nanos,
        count,
        sum: Some(sum),
        bucket_counts,
        explicit_bounds,
        exemplars: Vec::new(),
        flags: 0,
        min: None,
        max: None,
    }
}

fn to_proto_kv_owned(kv: &KeyValue) -> opentelemetry_proto::tonic::common::v1::KeyValue {
    super::key_value_to_proto(kv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use otel_sdk::metrics::ScopeMetrics;
    use otel_sdk::resource::{InstrumentationScope, Resource};

    #[test]
    fn counter_becomes_sum_with_monotonic_true() {
        let metrics = ResourceMetrics {
            resource: Resource::default(),
            scope_metrics: vec![ScopeMetrics {
                scope: InstrumentationScope::pipeline(),
                metrics: vec![MetricPoint::Counter {
                    name: "requests".into(),
                    unit: "1".into(),
                    temporality: Temporality::Cumulative,
                    data_points: vec![DataPoint {
                        timestamp_unix_nanos: 10,
                        start_time_unix_nanos: 0,
                        attributes: Vec::new(),
                        value: DataPointValue::Int(5),
                    }],
                }],
            }],
        };
        let proto = to_proto_resource_metrics(&metrics);
        match proto.scope_metrics[0].metrics[0].data.as_ref().unwrap() {
            Data::Sum(sum) => {
                assert!(sum.is_monotonic);
                assert_eq!(sum.data_points.len(), 1);
            }
            _ => panic!("expected Sum"),
        }
    }
}
