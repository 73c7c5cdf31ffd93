//! Resource and instrumentation-scope adapters (spec.md §3, §6).

use crate::value::KeyValue;
use std::collections::BTreeMap;
use std::sync::Arc;

const SERVICE_NAME: &str = "service.name";

/// An immutable attribute map describing the entity producing telemetry.
///
/// Cheap to clone: the attribute map is reference counted, mirroring the
/// teacher's `Resource` (which wraps its attributes so every processor and
/// exporter can hold a copy without re-allocating).
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

#[derive(Debug, PartialEq)]
struct ResourceInner {
    attributes: BTreeMap<String, crate::value::Value>,
    schema_url: Option<String>,
}

impl Default for Resource {
    fn default() -> Self {
        Resource::builder().build()
    }
}

impl Resource {
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder::default()
    }

    pub fn service_name(&self) -> Option<&str> {
        match self.inner.attributes.get(SERVICE_NAME) {
            Some(crate::value::Value::String(s)) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn schema_url(&self) -> Option<&str> {
        self.inner.schema_url.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &crate::value::Value)> {
        self.inner
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.inner.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.attributes.is_empty()
    }
}

#[derive(Default)]
pub struct ResourceBuilder {
    attributes: BTreeMap<String, crate::value::Value>,
    schema_url: Option<String>,
    service_name: Option<String>,
}

impl ResourceBuilder {
    pub fn with_attributes(mut self, attrs: impl IntoIterator<Item = KeyValue>) -> Self {
        for kv in attrs {
            self.attributes.insert(kv.key.into_owned(), kv.value);
        }
        self
    }

    pub fn with_schema_url(mut self, schema_url: impl Into<String>) -> Self {
        self.schema_url = Some(schema_url.into());
        self
    }

    /// `service.name` supplied directly takes precedence over the same
    /// key inside a separately supplied attribute map (spec.md §3).
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Merge `OTEL_RESOURCE_ATTRIBUTES` (comma-separated `key=value`
    /// pairs, percent-decoded per the OTLP resource SDK spec) with the
    /// in-code attribute map built so far.
    ///
    /// Per spec.md §9 the precedence between in-code values and the
    /// environment is left ambiguous by the source; this implementation
    /// preserves in-code values for any key present in both, and lets the
    /// environment fill in keys the in-code map does not set — i.e. code
    /// wins, env is a fallback. `service.name` is resolved separately by
    /// the dedicated field, which always wins over both.
    pub fn with_env_attributes(mut self, env_value: &str) -> Self {
        for pair in env_value.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            if let Some((k, v)) = pair.split_once('=') {
                let k = k.trim().to_string();
                let v = percent_decode(v.trim());
                self.attributes.entry(k).or_insert(crate::value::Value::String(v.into()));
            }
        }
        self
    }

    pub fn build(mut self) -> Resource {
        if let Some(name) = self.service_name {
            self.attributes
                .insert(SERVICE_NAME.to_string(), crate::value::Value::String(name.into()));
        }
        self.attributes
            .entry(SERVICE_NAME.to_string())
            .or_insert_with(|| crate::value::Value::String("unknown_service".into()));

        Resource {
            inner: Arc::new(ResourceInner {
                attributes: self.attributes,
                schema_url: self.schema_url,
            }),
        }
    }
}

fn percent_decode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(byte as char);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

/// Attribution of a batch of telemetry to the emitting library.
///
/// Every outgoing batch carries exactly one of these (spec.md §3, §6):
/// `{name: "swift-otel", version: <library version>}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstrumentationScope {
    pub name: &'static str,
    pub version: &'static str,
    pub attributes: Vec<(&'static str, &'static str)>,
}

impl InstrumentationScope {
    /// The fixed scope attached to every batch this pipeline exports.
    pub fn pipeline() -> Self {
        InstrumentationScope {
            name: "swift-otel",
            version: env!("CARGO_PKG_VERSION"),
            attributes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_resource_has_unknown_service_name() {
        let r = Resource::default();
        assert_eq!(r.service_name(), Some("unknown_service"));
    }

    #[test]
    fn explicit_service_name_wins_over_attribute_map() {
        let r = Resource::builder()
            .with_attributes(vec![KeyValue::new(SERVICE_NAME, "from-map")])
            .with_service_name("from-field")
            .build();
        assert_eq!(r.service_name(), Some("from-field"));
    }

    #[test]
    fn in_code_attribute_wins_over_env_attribute() {
        let r = Resource::builder()
            .with_attributes(vec![KeyValue::new("team", "code-value")])
            .with_env_attributes("team=env-value,region=us-west")
            .build();
        let attrs: BTreeMap<_, _> = r
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        assert_eq!(
            attrs.get("team"),
            Some(&crate::value::Value::String("code-value".into()))
        );
        assert_eq!(
            attrs.get("region"),
            Some(&crate::value::Value::String("us-west".into()))
        );
    }

    #[test]
    fn pipeline_scope_is_named_swift_otel() {
        assert_eq!(InstrumentationScope::pipeline().name, "swift-otel");
    }
}
