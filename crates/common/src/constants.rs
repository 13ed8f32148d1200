/// Default upstream request timeout (10 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Largest upstream body the bridge will buffer (10 MiB)
pub const DEFAULT_MAX_RESPONSE_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Whether cookies are relayed when the process configuration does not say
pub const DEFAULT_FORWARD_COOKIES: bool = true;

/// Path assigned to a cookie directive that carries no `Path` attribute
pub const DEFAULT_COOKIE_PATH: &str = "/";

/// Content type added to JSON bodies when the caller supplied none
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Environment variable holding the upstream origin
pub const ENV_UPSTREAM_BASE_URL: &str = "UPSTREAM_BASE_URL";

/// Environment variable holding the domain applied to domain-less cookies
pub const ENV_DEFAULT_COOKIE_DOMAIN: &str = "DEFAULT_COOKIE_DOMAIN";

/// Environment variable holding the upstream timeout in milliseconds
pub const ENV_REQUEST_TIMEOUT_MS: &str = "REQUEST_TIMEOUT_MS";

/// Environment variable holding the upstream body size limit in bytes
pub const ENV_MAX_RESPONSE_BODY_BYTES: &str = "MAX_RESPONSE_BODY_BYTES";

/// Environment variable holding the process-wide cookie forwarding default
pub const ENV_FORWARD_COOKIES: &str = "FORWARD_COOKIES";
