//! Server configuration.
//!
//! Values are resolved once at startup from built-in defaults, an optional
//! YAML file named by `LANTERN_CONFIG`, and `LANTERN_*` environment
//! variables (highest precedence). The result is immutable and shared
//! read-only by every connection.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_HOSTNAME: &str = "localhost";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:1965";
pub const DEFAULT_ROOT_DIR: &str = ".";
pub const DEFAULT_DEADLINE_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("LANTERN_TLS_KEY and LANTERN_TLS_CERT must both be provided")]
    MissingTls,

    #[error("invalid bind address {0:?}: expected host:port")]
    InvalidBindAddr(String),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Paths to the PEM encoded certificate chain and private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Hostname requests must name, matched case-sensitively.
    pub hostname: String,
    /// Address the listener binds to, e.g. `127.0.0.1:1965`.
    pub bind_addr: String,
    pub bind_host: String,
    /// Port part of `bind_addr`; an explicit request port must equal it.
    pub bind_port: String,
    /// Directory content is served from.
    pub root_dir: PathBuf,
    /// Bound on handshake, read, processing and write for one connection.
    pub deadline_secs: u64,
    pub tls: TlsConfig,
}

/// On-disk shape of the optional YAML config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub hostname: Option<String>,
    pub bind_addr: Option<String>,
    pub root_dir: Option<PathBuf>,
    pub deadline_secs: Option<u64>,
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable lookup. The
    /// environment-facing `load` delegates here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let file = match var("LANTERN_CONFIG") {
            Some(path) => {
                let path = PathBuf::from(path);
                let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                FileConfig::from_yaml_str(&content)
                    .map_err(|source| ConfigError::Parse { path, source })?
            }
            None => FileConfig::default(),
        };

        let cert_path = var("LANTERN_TLS_CERT").map(PathBuf::from).or(file.tls_cert);
        let key_path = var("LANTERN_TLS_KEY").map(PathBuf::from).or(file.tls_key);
        let (Some(cert_path), Some(key_path)) = (cert_path, key_path) else {
            return Err(ConfigError::MissingTls);
        };

        let hostname = var("LANTERN_HOSTNAME")
            .or(file.hostname)
            .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());
        let bind_addr = var("LANTERN_BIND_ADDR")
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let root_dir = var("LANTERN_ROOT_DIR")
            .map(PathBuf::from)
            .or(file.root_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_DIR));

        let mut deadline_secs = file
            .deadline_secs
            .filter(|&d| d > 0)
            .unwrap_or(DEFAULT_DEADLINE_SECS);
        if let Some(raw) = var("LANTERN_DEADLINE") {
            match raw.parse::<u64>() {
                Ok(d) if d > 0 => deadline_secs = d,
                _ => tracing::warn!(value = %raw, "Unable to set deadline. Double check LANTERN_DEADLINE"),
            }
        }

        let (bind_host, bind_port) = split_host_port(&bind_addr)?;

        Ok(Self {
            hostname,
            bind_host,
            bind_port,
            bind_addr,
            root_dir,
            deadline_secs,
            tls: TlsConfig { cert_path, key_path },
        })
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// Logs every effective value, once, at startup.
    pub fn log_summary(&self) {
        tracing::info!(
            tls_cert = %self.tls.cert_path.display(),
            tls_key = %self.tls.key_path.display(),
            hostname = %self.hostname,
            bind_addr = %self.bind_addr,
            root_dir = %self.root_dir.display(),
            deadline_secs = self.deadline_secs,
            "Configuration loaded"
        );
    }
}

/// Splits `host:port`, accepting bracketed IPv6 hosts like `[::1]:1965`.
pub fn split_host_port(addr: &str) -> Result<(String, String), ConfigError> {
    let invalid = || ConfigError::InvalidBindAddr(addr.to_string());

    let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
    let host = match host.strip_prefix('[') {
        Some(inner) => inner.strip_suffix(']').ok_or_else(invalid)?,
        None if host.contains(':') => return Err(invalid()),
        None => host,
    };
    if port.is_empty() {
        return Err(invalid());
    }

    Ok((host.to_string(), port.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_bracketed_ipv6() {
        let (host, port) = split_host_port("[::1]:1965").unwrap();
        assert_eq!(host, "::1");
        assert_eq!(port, "1965");
    }

    #[test]
    fn split_rejects_unbracketed_ipv6() {
        assert!(split_host_port("::1:1965").is_err());
    }
}
