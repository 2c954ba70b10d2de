//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `VIGIL_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `VIGIL_HTTP_PORT`: Port of the HTTP stats and health surface (default: 8080)
/// - `VIGIL_GRPC_PORT`: Port of the OTLP gRPC receivers (default: 4317)
/// - `VIGIL_MAX_RECV_MSG_SIZE_MIB`: Largest accepted gRPC message (default: 4)
/// - `VIGIL_STATS_LOG_INTERVAL_SECS`: Stats logging period, 0 disables (default: 30)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The HTTP port.
    pub http_port: u16,
    /// The gRPC port.
    pub grpc_port: u16,
    /// Maximum decoded gRPC message size in MiB.
    pub max_recv_msg_size_mib: usize,
    /// Seconds between stats log lines; zero disables the logger.
    pub stats_log_interval_secs: u64,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates a configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: lookup("VIGIL_HOST").unwrap_or(defaults.host),
            http_port: parse_var(&lookup, "VIGIL_HTTP_PORT")?.unwrap_or(defaults.http_port),
            grpc_port: parse_var(&lookup, "VIGIL_GRPC_PORT")?.unwrap_or(defaults.grpc_port),
            max_recv_msg_size_mib: parse_var(&lookup, "VIGIL_MAX_RECV_MSG_SIZE_MIB")?
                .unwrap_or(defaults.max_recv_msg_size_mib),
            stats_log_interval_secs: parse_var(&lookup, "VIGIL_STATS_LOG_INTERVAL_SECS")?
                .unwrap_or(defaults.stats_log_interval_secs),
        })
    }

    /// Returns the socket address of the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a valid IP address.
    pub fn http_addr(&self) -> Result<SocketAddr> {
        self.socket_addr(self.http_port)
    }

    /// Returns the socket address of the gRPC server.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a valid IP address.
    pub fn grpc_addr(&self) -> Result<SocketAddr> {
        self.socket_addr(self.grpc_port)
    }

    /// Maximum decoded gRPC message size in bytes.
    #[must_use]
    pub fn max_recv_msg_size_bytes(&self) -> usize {
        self.max_recv_msg_size_mib.saturating_mul(1024 * 1024)
    }

    /// Stats logging interval, `None` when disabled.
    #[must_use]
    pub fn stats_log_interval(&self) -> Option<Duration> {
        (self.stats_log_interval_secs > 0)
            .then(|| Duration::from_secs(self.stats_log_interval_secs))
    }

    fn socket_addr(&self, port: u16) -> Result<SocketAddr> {
        format!("{}:{}", self.host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{port}", self.host))
    }
}

fn parse_var<T>(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| raw.parse::<T>())
        .transpose()
        .with_context(|| format!("invalid value for {key}"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            grpc_port: 4317,
            max_recv_msg_size_mib: 4,
            stats_log_interval_secs: 30,
        }
    }
}
