//! Process-wide bridge configuration
//!
//! Resolved once at startup, either from the environment or from CLI
//! arguments, and shared read-only by every forward call.

use session_bridge_common::{
    BridgeError, Result,
    constants::{
        DEFAULT_FORWARD_COOKIES, DEFAULT_MAX_RESPONSE_BODY_BYTES, DEFAULT_REQUEST_TIMEOUT_MS,
        ENV_DEFAULT_COOKIE_DOMAIN, ENV_FORWARD_COOKIES, ENV_MAX_RESPONSE_BODY_BYTES,
        ENV_REQUEST_TIMEOUT_MS, ENV_UPSTREAM_BASE_URL,
    },
};
use std::time::Duration;
use url::Url;

/// Configuration for the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Upstream origin (and optional path prefix), without trailing slash
    pub upstream_base_url: String,

    /// Domain given to upstream cookies that carry no `Domain` attribute
    pub default_cookie_domain: Option<String>,

    /// Bound on each upstream call, body included
    pub request_timeout: Duration,

    /// Whether `Bridge::default_options` relays cookies
    pub forward_cookies: bool,

    /// Upstream bodies larger than this fail the call
    pub max_response_body_bytes: usize,
}

impl BridgeConfig {
    /// Create a configuration with default timeout and cookie settings
    pub fn new(upstream_base_url: &str) -> Result<Self> {
        Ok(Self {
            upstream_base_url: normalize_base_url(upstream_base_url)?,
            default_cookie_domain: None,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            forward_cookies: DEFAULT_FORWARD_COOKIES,
            max_response_body_bytes: DEFAULT_MAX_RESPONSE_BODY_BYTES,
        })
    }

    pub fn with_default_cookie_domain(mut self, domain: Option<String>) -> Self {
        self.default_cookie_domain = domain
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(BridgeError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        self.request_timeout = timeout;
        Ok(self)
    }

    pub fn with_forward_cookies(mut self, forward_cookies: bool) -> Self {
        self.forward_cookies = forward_cookies;
        self
    }

    pub fn with_max_response_body_bytes(mut self, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(BridgeError::InvalidConfig(
                "response body limit must be greater than zero".to_string(),
            ));
        }
        self.max_response_body_bytes = limit;
        Ok(self)
    }

    /// Load from `UPSTREAM_BASE_URL`, `DEFAULT_COOKIE_DOMAIN`,
    /// `REQUEST_TIMEOUT_MS`, `FORWARD_COOKIES` and `MAX_RESPONSE_BODY_BYTES`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup(ENV_UPSTREAM_BASE_URL).ok_or_else(|| {
            BridgeError::InvalidConfig(format!("{} environment variable not set", ENV_UPSTREAM_BASE_URL))
        })?;

        let mut config = Self::new(&base_url)?
            .with_default_cookie_domain(lookup(ENV_DEFAULT_COOKIE_DOMAIN));

        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            let millis = raw.trim().parse::<u64>().map_err(|e| {
                BridgeError::InvalidConfig(format!("{}={}: {}", ENV_REQUEST_TIMEOUT_MS, raw, e))
            })?;
            config = config.with_request_timeout(Duration::from_millis(millis))?;
        }

        if let Some(raw) = lookup(ENV_FORWARD_COOKIES) {
            config = config.with_forward_cookies(parse_flag(ENV_FORWARD_COOKIES, &raw)?);
        }

        if let Some(raw) = lookup(ENV_MAX_RESPONSE_BODY_BYTES) {
            let limit = raw.trim().parse::<usize>().map_err(|e| {
                BridgeError::InvalidConfig(format!("{}={}: {}", ENV_MAX_RESPONSE_BODY_BYTES, raw, e))
            })?;
            config = config.with_max_response_body_bytes(limit)?;
        }

        Ok(config)
    }

    /// Full upstream URL for a validated descriptor path
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.upstream_base_url, path)
    }
}

/// Only absolute http(s) URLs without query or fragment make sense as a base
fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed)
        .map_err(|e| BridgeError::InvalidConfig(format!("invalid upstream URL {}: {}", trimmed, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(BridgeError::InvalidConfig(format!(
            "unsupported upstream scheme: {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(BridgeError::InvalidConfig(format!(
            "upstream URL has no host: {}",
            trimmed
        )));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(BridgeError::InvalidConfig(format!(
            "upstream URL must not carry a query or fragment: {}",
            trimmed
        )));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(BridgeError::InvalidConfig(format!(
            "{}={} is not a boolean",
            key, raw
        ))),
    }
}
