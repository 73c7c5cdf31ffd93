//! OTLP/gRPC transport shared by the per-signal exporters (spec.md §4.6).
//!
//! Retry is not reimplemented here: the spec defers to "the gRPC
//! transport's default policy", so a single RPC per `export` call is all
//! this layer does. Graceful shutdown tracks in-flight RPCs itself since
//! `tonic::transport::Channel` has no such notion on its own.

pub mod logs;
pub mod metrics;
pub mod trace;

use crate::config::{ExporterConfig, TlsConfig};
use crate::error::Error;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};

pub(crate) fn build_channel(config: &ExporterConfig) -> Result<Channel, Error> {
    config.validate()?;
    let endpoint = Endpoint::from_shared(config.endpoint.clone())?.timeout(config.timeout);

    let endpoint = if config.tls.insecure {
        endpoint
    } else {
        endpoint.tls_config(tls_config(&config.tls)?)?
    };

    Ok(endpoint.connect_lazy())
}

fn tls_config(tls: &TlsConfig) -> Result<ClientTlsConfig, Error> {
    let mut cfg = ClientTlsConfig::new();
    if let Some(ca) = &tls.ca_cert_path {
        let pem = std::fs::read(ca)
            .map_err(|e| otel_sdk::ConfigError::Invalid(e.to_string()))?;
        cfg = cfg.ca_certificate(Certificate::from_pem(pem));
    }
    if let (Some(cert), Some(key)) = (&tls.client_cert_path, &tls.client_key_path) {
        let cert_pem = std::fs::read(cert)
            .map_err(|e| otel_sdk::ConfigError::Invalid(e.to_string()))?;
        let key_pem = std::fs::read(key)
            .map_err(|e| otel_sdk::ConfigError::Invalid(e.to_string()))?;
        cfg = cfg.identity(Identity::from_pem(cert_pem, key_pem));
    }
    Ok(cfg)
}

/// Counts RPCs in flight so `shutdown` can wait for them to drain instead
/// of severing the channel out from under a caller.
#[derive(Clone, Default)]
pub(crate) struct Inflight(Arc<AtomicI64>);

impl Inflight {
    pub(crate) fn enter(&self) -> InflightGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        InflightGuard(self.0.clone())
    }

    pub(crate) async fn drain(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while self.0.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

pub(crate) struct InflightGuard(Arc<AtomicI64>);

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
