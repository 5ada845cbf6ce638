//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Unset variables fall back to the
//! values of [`GatewayConfig::default`].

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::GatewayError;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Path of the STOMP WebSocket endpoint.
    pub ws_endpoint: String,

    /// Prefix of destinations served by registered handlers.
    pub app_destination_prefix: String,

    /// Prefix of destinations published straight to the broker.
    pub broker_destination_prefix: String,

    /// Capacity of the broker's broadcast channel.
    pub broker_capacity: usize,

    /// Simulated latency before a greeting is published.
    pub greeting_delay: Duration,

    /// Largest accepted STOMP frame, in bytes.
    pub max_frame_bytes: usize,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            ws_endpoint: "/gs-guide-websocket".to_owned(),
            app_destination_prefix: "/app".to_owned(),
            broker_destination_prefix: "/topic".to_owned(),
            broker_capacity: 1024,
            greeting_delay: Duration::from_secs(1),
            max_frame_bytes: 64 * 1024,
            log_format: LogFormat::Text,
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to the defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidConfig`] if `LISTEN_ADDR` is set but
    /// cannot be parsed as a [`SocketAddr`], or if the endpoint or a
    /// destination prefix does not start with `/`.
    pub fn from_env() -> Result<Self, GatewayError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, which maps a variable name
    /// to its value. [`GatewayConfig::from_env`] passes the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let listen_addr = match lookup("LISTEN_ADDR") {
            Some(raw) => raw
                .parse()
                .map_err(|e| GatewayError::InvalidConfig(format!("LISTEN_ADDR '{raw}': {e}")))?,
            None => defaults.listen_addr,
        };

        let ws_endpoint = parse_path(&lookup, "WS_ENDPOINT", defaults.ws_endpoint)?;
        let app_destination_prefix =
            parse_path(&lookup, "APP_DESTINATION_PREFIX", defaults.app_destination_prefix)?;
        let broker_destination_prefix = parse_path(
            &lookup,
            "BROKER_DESTINATION_PREFIX",
            defaults.broker_destination_prefix,
        )?;

        let broker_capacity = parse_env(&lookup, "BROKER_CAPACITY", defaults.broker_capacity);
        let default_delay_ms =
            u64::try_from(defaults.greeting_delay.as_millis()).unwrap_or(u64::MAX);
        let greeting_delay =
            Duration::from_millis(parse_env(&lookup, "GREETING_DELAY_MS", default_delay_ms));
        let max_frame_bytes = parse_env(&lookup, "MAX_FRAME_BYTES", defaults.max_frame_bytes);

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json" | "JSON") => LogFormat::Json,
            _ => defaults.log_format,
        };

        Ok(Self {
            listen_addr,
            ws_endpoint,
            app_destination_prefix,
            broker_destination_prefix,
            broker_capacity,
            greeting_delay,
            max_frame_bytes,
            log_format,
        })
    }
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_env<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Reads an absolute path such as `/app`, dropping a trailing slash.
fn parse_path<F>(lookup: &F, key: &str, default: String) -> Result<String, GatewayError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => validate_path(key, &raw),
        None => Ok(default),
    }
}

fn validate_path(key: &str, raw: &str) -> Result<String, GatewayError> {
    if !raw.starts_with('/') {
        return Err(GatewayError::InvalidConfig(format!(
            "{key} must start with '/', got '{raw}'"
        )));
    }
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(GatewayError::InvalidConfig(format!("{key} must not be '/'")));
    }
    Ok(trimmed.to_owned())
}
