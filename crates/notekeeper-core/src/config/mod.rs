//! Client configuration.
//!
//! Provides the `ClientConfig` struct injected into the HTTP client and the
//! realtime channel. Nothing here is global: front ends build one config and
//! hand it to every component that talks to the server.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, is_ws_url, normalize_text_option};

pub const DEFAULT_BASE_URL: &str = "https://notekeeper.memento-dev.fr/api";
pub const DEFAULT_SOCKET_URL: &str = "wss://notekeeper.memento-dev.fr/ws";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;

pub const BASE_URL_ENV: &str = "NOTEKEEPER_BASE_URL";
pub const SOCKET_URL_ENV: &str = "NOTEKEEPER_SOCKET_URL";

/// Endpoints and timings for the remote note service and realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// REST API root, e.g. `https://host/api`
    pub base_url: String,
    /// WebSocket endpoint, e.g. `wss://host/ws`
    pub socket_url: String,
    pub http_timeout_secs: u64,
    /// Fixed delay before the channel reconnects after a drop
    pub reconnect_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}

impl ClientConfig {
    /// Build a config for the given endpoints with default timings.
    pub fn new(base_url: impl Into<String>, socket_url: impl Into<String>) -> Result<Self> {
        Self {
            base_url: base_url.into(),
            socket_url: socket_url.into(),
            ..Self::default()
        }
        .normalized()
    }

    /// Parse a config from a raw JSON payload; omitted fields take defaults.
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::Config(format!("invalid client config JSON: {error}")))?;
        config.normalized()
    }

    /// Apply overrides from the environment (or any other lookup).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = normalize_text_option(lookup(BASE_URL_ENV)) {
            self.base_url = base_url;
        }
        if let Some(socket_url) = normalize_text_option(lookup(SOCKET_URL_ENV)) {
            self.socket_url = socket_url;
        }
        self.normalized()
    }

    /// Validate schemes and trim trailing slashes.
    pub fn normalized(self) -> Result<Self> {
        let base_url = normalize_endpoint(self.base_url, "base_url", is_http_url, "http(s)")?;
        let socket_url = normalize_endpoint(self.socket_url, "socket_url", is_ws_url, "ws(s)")?;
        if self.http_timeout_secs == 0 {
            return Err(Error::Config(
                "http_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            socket_url,
            ..self
        })
    }

    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

fn normalize_endpoint(
    raw: String,
    field: &str,
    scheme_ok: fn(&str) -> bool,
    expected: &str,
) -> Result<String> {
    let value = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config(format!("config field '{field}' is required")))?;
    if scheme_ok(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(format!(
            "config field '{field}' must use a {expected} scheme"
        )))
    }
}
