//! Client configuration.
//!
//! [`ClientConfig`] is filled in by the command-line front end; the core only
//! consumes it.  [`RetryPolicy`] is the part the transport needs.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1111;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Retransmission parameters for one transport.
///
/// No backoff: every attempt waits the same `timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total transmissions per request (first send included), at least 1.
    pub retries: u32,
    /// How long each attempt waits for a reply, non-zero.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::BadTimeout(0.0));
        }
        Ok(())
    }

    /// Upper bound on how long one `send` can block.
    pub fn worst_case(&self) -> Duration {
        self.timeout * self.retries
    }
}

/// Everything needed to reach a board server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        self.retry.validate()
    }

    /// Resolve `host:port` to the first address the resolver returns.
    pub async fn server_addr(&self) -> Result<SocketAddr, ConfigError> {
        let target = (self.host.as_str(), self.port);
        tokio::net::lookup_host(target)
            .await
            .map_err(|e| ConfigError::Resolve(self.host.clone(), e.to_string()))?
            .next()
            .ok_or_else(|| ConfigError::Resolve(self.host.clone(), "no addresses".into()))
    }
}

/// Turn a timeout given in (possibly fractional) seconds into a [`Duration`].
pub fn timeout_from_secs(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::BadTimeout(secs));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::BadTimeout(secs))
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("retry count must be at least 1")]
    ZeroRetries,
    #[error("timeout must be a positive number of seconds, got {0}")]
    BadTimeout(f64),
    #[error("server host is empty")]
    EmptyHost,
    #[error("cannot resolve {0}: {1}")]
    Resolve(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.port, 1111);
        assert_eq!(cfg.retry.retries, 3);
        assert_eq!(cfg.retry.timeout, Duration::from_millis(100));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_retries_rejected() {
        let p = RetryPolicy {
            retries: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(p.validate(), Err(ConfigError::ZeroRetries));
    }

    #[test]
    fn zero_timeout_rejected() {
        let p = RetryPolicy {
            timeout: Duration::ZERO,
            ..RetryPolicy::default()
        };
        assert!(matches!(p.validate(), Err(ConfigError::BadTimeout(_))));
    }

    #[test]
    fn timeout_seconds_parse() {
        assert_eq!(timeout_from_secs(0.1), Ok(Duration::from_millis(100)));
        assert_eq!(timeout_from_secs(2.0), Ok(Duration::from_secs(2)));
        assert!(timeout_from_secs(0.0).is_err());
        assert!(timeout_from_secs(-1.0).is_err());
        assert!(timeout_from_secs(f64::NAN).is_err());
        assert!(timeout_from_secs(f64::INFINITY).is_err());
    }

    #[test]
    fn worst_case_is_retries_times_timeout() {
        let p = RetryPolicy {
            retries: 3,
            timeout: Duration::from_millis(100),
        };
        assert_eq!(p.worst_case(), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn loopback_resolves() {
        let cfg = ClientConfig {
            host: "127.0.0.1".into(),
            port: 4000,
            ..ClientConfig::default()
        };
        let addr = cfg.server_addr().await.unwrap();
        assert_eq!(addr, "127.0.0.1:4000".parse::<SocketAddr>().unwrap());
    }
}
