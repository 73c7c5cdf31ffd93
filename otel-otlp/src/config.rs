//! Exporter configuration surface (spec.md §6, §7 `config_invalid`).

use crate::compression::Compression;
use otel_sdk::ConfigError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    HttpProtobuf,
    HttpJson,
    Grpc,
}

#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub ca_cert_path: Option<PathBuf>,
    pub client_cert_path: Option<PathBuf>,
    pub client_key_path: Option<PathBuf>,
    /// Only meaningful for gRPC endpoints that don't carry an explicit
    /// scheme (spec.md §6).
    pub insecure: bool,
}

impl TlsConfig {
    /// mTLS requires both a client certificate and a client key; only one
    /// supplied is a configuration error (spec.md §6, §7).
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (&self.client_cert_path, &self.client_key_path) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(ConfigError::IncompleteMtls("client TLS"));
            }
            _ => {}
        }
        for path in [
            self.ca_cert_path.as_ref(),
            self.client_cert_path.as_ref(),
            self.client_key_path.as_ref(),
        ]
        .into_iter()
        .flatten()
        {
            check_exists(path)?;
        }
        Ok(())
    }
}

fn check_exists(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ConfigError::CertificateNotFound(
            path.display().to_string(),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub protocol: Protocol,
    pub endpoint: String,
    pub headers: HashMap<String, String>,
    pub compression: Compression,
    pub timeout: Duration,
    pub tls: TlsConfig,
    /// Upper bound on how long a gRPC exporter's `shutdown` waits for
    /// in-flight RPCs to finish before closing the channel (spec.md §4.6).
    pub shutdown_timeout: Duration,
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tls.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_configured_mtls_is_invalid() {
        let tls = TlsConfig {
            client_cert_path: Some(PathBuf::from("/tmp/does-not-matter.crt")),
            ..Default::default()
        };
        assert!(matches!(tls.validate(), Err(ConfigError::IncompleteMtls(_))));
    }

    #[test]
    fn fully_configured_mtls_checks_file_existence() {
        let tls = TlsConfig {
            client_cert_path: Some(PathBuf::from("/definitely/missing.crt")),
            client_key_path: Some(PathBuf::from("/definitely/missing.key")),
            ..Default::default()
        };
        assert!(matches!(
            tls.validate(),
            Err(ConfigError::CertificateNotFound(_))
        ));
    }

    #[test]
    fn no_tls_paths_is_valid() {
        assert!(TlsConfig::default().validate().is_ok());
    }
}
