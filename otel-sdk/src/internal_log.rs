//! Thin wrappers around `tracing` macros, gated by the `internal-logs`
//! feature so a host application can compile the diagnostic layer out
//! entirely. Mirrors the `otel_debug!`/`otel_warn!` pattern the teacher
//! builds around `tracing::debug!`/`tracing::warn!`.

#[macro_export]
#[cfg(feature = "internal-logs")]
macro_rules! otel_debug {
    (name: $name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::debug!(name: $name, target: "otel_sdk", $($key = $value),*);
    };
}

#[macro_export]
#[cfg(not(feature = "internal-logs"))]
macro_rules! otel_debug {
    (name: $name:expr, $($key:ident = $value:expr),* $(,)?) => {};
}

#[macro_export]
#[cfg(feature = "internal-logs")]
macro_rules! otel_warn {
    (name: $name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::warn!(name: $name, target: "otel_sdk", $($key = $value),*);
    };
}

#[macro_export]
#[cfg(not(feature = "internal-logs"))]
macro_rules! otel_warn {
    (name: $name:expr, $($key:ident = $value:expr),* $(,)?) => {};
}

#[macro_export]
#[cfg(feature = "internal-logs")]
macro_rules! otel_error {
    (name: $name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::error!(name: $name, target: "otel_sdk", $($key = $value),*);
    };
}

#[macro_export]
#[cfg(not(feature = "internal-logs"))]
macro_rules! otel_error {
    (name: $name:expr, $($key:ident = $value:expr),* $(,)?) => {};
}
