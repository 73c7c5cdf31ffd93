//! Endpoint resolution (spec.md §6, §8 scenario 7).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Traces,
    Metrics,
    Logs,
}

impl Signal {
    fn path_suffix(self) -> &'static str {
        match self {
            Signal::Traces => "v1/traces",
            Signal::Metrics => "v1/metrics",
            Signal::Logs => "v1/logs",
        }
    }
}

/// Default HTTP OTLP endpoint (protocol `http/protobuf` or `http/json`).
pub const DEFAULT_HTTP_ENDPOINT: &str = "http://localhost:4318";

/// Default gRPC OTLP endpoint.
pub const DEFAULT_GRPC_ENDPOINT: &str = "http://localhost:4317";

/// Resolves the HTTP endpoint for `signal` given:
/// - `explicit_signal_endpoint`: a per-signal override (in code or from
///   `OTEL_EXPORTER_OTLP_<SIGNAL>_ENDPOINT`), used as-is with no suffix.
/// - `base_endpoint`: the shared endpoint (in code or from
///   `OTEL_EXPORTER_OTLP_ENDPOINT`, falling back to
///   [`DEFAULT_HTTP_ENDPOINT`]); the signal suffix is appended to this
///   unless an explicit override was given.
pub fn resolve_http_endpoint(
    signal: Signal,
    explicit_signal_endpoint: Option<&str>,
    base_endpoint: Option<&str>,
) -> String {
    if let Some(explicit) = explicit_signal_endpoint {
        return explicit.to_string();
    }
    let base = base_endpoint.unwrap_or(DEFAULT_HTTP_ENDPOINT);
    let base = base.trim_end_matches('/');
    format!("{base}/{}", signal.path_suffix())
}

/// gRPC has no per-signal path suffix: the shared endpoint is used as-is,
/// or [`DEFAULT_GRPC_ENDPOINT`] if none was configured (spec.md §6).
pub fn resolve_grpc_endpoint(explicit_endpoint: Option<&str>) -> String {
    explicit_endpoint
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_GRPC_ENDPOINT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_gets_signal_suffix() {
        let endpoint = resolve_http_endpoint(Signal::Traces, None, None);
        assert_eq!(endpoint, "http://localhost:4318/v1/traces");
    }

    #[test]
    fn shared_override_with_trailing_slash_gets_suffix() {
        let endpoint = resolve_http_endpoint(
            Signal::Traces,
            None,
            Some("https://otel-collector.example.com:4318/"),
        );
        assert_eq!(endpoint, "https://otel-collector.example.com:4318/v1/traces");
    }

    #[test]
    fn explicit_signal_override_bypasses_suffix() {
        let endpoint = resolve_http_endpoint(
            Signal::Traces,
            Some("https://other.example.com/custom"),
            Some("https://otel-collector.example.com:4318/"),
        );
        assert_eq!(endpoint, "https://other.example.com/custom");
    }

    #[test]
    fn grpc_default_endpoint() {
        assert_eq!(resolve_grpc_endpoint(None), "http://localhost:4317");
    }

    #[test]
    fn grpc_explicit_endpoint_used_as_is() {
        assert_eq!(
            resolve_grpc_endpoint(Some("https://collector.example.com:4317")),
            "https://collector.example.com:4317"
        );
    }
}
