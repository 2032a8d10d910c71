//! Configuration for the Confab service.
//!
//! All deployment settings come from environment variables at startup.
//! Required variables fail fast with [`Error::Config`] naming the variable;
//! optional ones fall back to defaults.
//!
//! # Environment Variables
//!
//! ## Required
//! - `AWS_REGION` - Bedrock region, e.g. `us-east-1`
//! - `AWS_BEARER_TOKEN_BEDROCK` - Bedrock API key (bearer token)
//! - `CLAUDE_MODEL_ID` - model id passed to InvokeModel
//!
//! ## Optional
//! - `PORT` - listen port (default 3000)
//! - `BIND_ADDRESS` - listen address (default 0.0.0.0)
//! - `LOG_LEVEL` - trace/debug/info/warn/error (default info)
//! - `LOG_FORMAT` - "pretty" or "json" (default pretty)

use crate::error::{Error, Result};
use std::time::Duration;

/// Top-level service configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Upstream Bedrock endpoint settings
    pub bedrock: BedrockConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Behavioral tunables
    pub limits: Limits,
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default `0.0.0.0`)
    pub bind: String,
    /// Listen port (default 3000)
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// Bedrock endpoint settings.
#[derive(Debug, Clone, Default)]
pub struct BedrockConfig {
    /// AWS region the runtime endpoint lives in
    pub region: String,
    /// Bearer token for the Bedrock API
    pub api_key: String,
    /// Model id passed in the InvokeModel path
    pub model_id: String,
}

/// Logging settings.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            log_format: "pretty".into(),
        }
    }
}

/// Behavioral tunables.
///
/// Fixed in code rather than environment-driven; tests override individual
/// fields.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Retained exchanges per session. History holds twice this in turns.
    pub memory_limit: usize,
    /// Retries after the initial upstream attempt.
    pub max_retries: u32,
    /// Base backoff delay, doubled with each retry.
    pub retry_delay: Duration,
    /// Minimum spacing between upstream calls for one session.
    pub rate_limit_delay: Duration,
    /// Character cap per document chunk.
    pub max_chunk_size: usize,
    /// Upload size ceiling in bytes.
    pub max_upload_bytes: usize,
    /// Ceiling on base64-encoded image payloads in bytes.
    pub max_image_base64_bytes: usize,
    /// Idle time before a session is dropped.
    pub session_ttl: Duration,
    /// Cadence of the idle-session sweep.
    pub sweep_interval: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            memory_limit: 30,
            max_retries: 3,
            retry_delay: Duration::from_millis(5000),
            rate_limit_delay: Duration::from_millis(5000),
            max_chunk_size: 24_000,
            max_upload_bytes: 10 * 1024 * 1024,
            max_image_base64_bytes: 1024 * 1024,
            session_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Fails with a [`Error::Config`] naming the first missing required
    /// variable, so misconfigured deployments exit before binding a port.
    pub fn from_env() -> Result<Self> {
        let port_raw = env_or("PORT", "3000");
        let port: u16 = port_raw
            .parse()
            .map_err(|_| Error::Config(format!("PORT is not a valid port number: {port_raw}")))?;

        Ok(Self {
            server: ServerConfig {
                bind: env_or("BIND_ADDRESS", "0.0.0.0"),
                port,
            },
            bedrock: BedrockConfig {
                region: require_env("AWS_REGION")?,
                api_key: require_env("AWS_BEARER_TOKEN_BEDROCK")?,
                model_id: require_env("CLAUDE_MODEL_ID")?,
            },
            observability: ObservabilityConfig {
                log_level: env_or("LOG_LEVEL", "info"),
                log_format: env_or("LOG_FORMAT", "pretty"),
            },
            limits: Limits::default(),
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Config(format!("{name} is not set"))),
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.memory_limit, 30);
        assert_eq!(limits.max_retries, 3);
        assert_eq!(limits.retry_delay, Duration::from_millis(5000));
        assert_eq!(limits.rate_limit_delay, Duration::from_millis(5000));
        assert_eq!(limits.max_chunk_size, 24_000);
        assert_eq!(limits.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(limits.max_image_base64_bytes, 1024 * 1024);
    }

    #[test]
    fn test_default_server_config() {
        let server = ServerConfig::default();
        assert_eq!(server.bind, "0.0.0.0");
        assert_eq!(server.port, 3000);
    }

    // Env mutation is process-global, so the whole round trip lives in one
    // test to stay deterministic under parallel execution.
    #[test]
    fn test_from_env_round_trip() {
        std::env::remove_var("PORT");
        std::env::remove_var("BIND_ADDRESS");
        std::env::remove_var("LOG_LEVEL");
        std::env::remove_var("LOG_FORMAT");
        std::env::set_var("AWS_REGION", "us-east-1");
        std::env::set_var("AWS_BEARER_TOKEN_BEDROCK", "test-token");
        std::env::set_var("CLAUDE_MODEL_ID", "anthropic.claude-3-sonnet");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bedrock.region, "us-east-1");
        assert_eq!(config.bedrock.model_id, "anthropic.claude-3-sonnet");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.observability.log_level, "info");

        std::env::set_var("PORT", "not-a-port");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("PORT"));
        std::env::remove_var("PORT");

        std::env::remove_var("CLAUDE_MODEL_ID");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("CLAUDE_MODEL_ID"));
    }
}
