//! Input validation for descriptor and cookie data
//!
//! Everything that ends up in an upstream request line, an upstream header or a
//! downstream `Set-Cookie` header passes through here first, so header
//! injection and malformed cookie names are rejected before any I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// RFC 7230 header-name token
static HEADER_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[!#$%&'*+\-.^_`|~0-9A-Za-z]+$").unwrap());

/// Maximum length for HTTP header values
pub const MAX_HEADER_VALUE_LENGTH: usize = 8192;

/// Maximum length for HTTP paths
pub const MAX_PATH_LENGTH: usize = 2048;

/// Connection-level and framing headers owned by the HTTP client
pub const RESERVED_HEADER_NAMES: &[&str] = &[
    "connection",
    "content-length",
    "host",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Path must not be empty")]
    EmptyPath,

    #[error("Path too long: {0} bytes (max: {1})")]
    PathTooLong(usize, usize),

    #[error("Path must be relative to the upstream base URL: {0}")]
    AbsolutePath(String),

    #[error("Header value too long: {0} bytes (max: {1})")]
    HeaderValueTooLong(usize, usize),

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),

    #[error("Header is managed by the HTTP client: {0}")]
    ReservedHeader(String),

    #[error("Invalid cookie name: {0}")]
    InvalidCookieName(String),

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
}

/// Validate and sanitize an upstream path
///
/// - Rejects empty paths and absolute URLs
/// - Removes control characters
/// - Enforces length limits
/// - Ensures path starts with /
///
/// # Examples
///
/// ```
/// use session_bridge_common::validation::validate_path;
///
/// assert_eq!(validate_path("auth/me").unwrap(), "/auth/me");
/// assert!(validate_path("").is_err());
/// assert!(validate_path("https://evil.example.com/").is_err());
/// ```
pub fn validate_path(path: &str) -> Result<String, ValidationError> {
    if path.len() > MAX_PATH_LENGTH {
        return Err(ValidationError::PathTooLong(path.len(), MAX_PATH_LENGTH));
    }

    let sanitized: String = path.chars().filter(|c| !c.is_control()).collect();
    let sanitized = sanitized.trim();

    if sanitized.is_empty() {
        return Err(ValidationError::EmptyPath);
    }

    // "//host/..." would be resolved as a scheme-relative URL by some clients
    if sanitized.contains("://") || sanitized.starts_with("//") {
        return Err(ValidationError::AbsolutePath(
            sanitized.chars().take(50).collect::<String>(), // Limit error message
        ));
    }

    if sanitized.starts_with('/') {
        Ok(sanitized.to_string())
    } else {
        Ok(format!("/{}", sanitized))
    }
}

/// Sanitize HTTP header value
///
/// - Removes dangerous control characters (except tab)
/// - Enforces length limits
pub fn sanitize_header_value(value: &str) -> Result<String, ValidationError> {
    if value.len() > MAX_HEADER_VALUE_LENGTH {
        return Err(ValidationError::HeaderValueTooLong(
            value.len(),
            MAX_HEADER_VALUE_LENGTH,
        ));
    }

    let sanitized: String = value
        .chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .collect();

    Ok(sanitized)
}

/// Normalize a header name to lowercase
///
/// Rejects anything that is not a token, and the hop-by-hop and framing
/// headers in [`RESERVED_HEADER_NAMES`].
pub fn sanitize_header_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if !HEADER_NAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidHeaderName(
            trimmed.chars().take(50).collect::<String>(),
        ));
    }

    let lowercase = trimmed.to_ascii_lowercase();
    if RESERVED_HEADER_NAMES.contains(&lowercase.as_str()) {
        return Err(ValidationError::ReservedHeader(lowercase));
    }

    Ok(lowercase)
}

/// Validate a cookie name
///
/// Names only need to be non-empty and free of `=`, `;`, whitespace and
/// control characters. Upstreams do send names like `cart[1]` or `user:id`.
pub fn validate_cookie_name(name: &str) -> Result<(), ValidationError> {
    let invalid = name.is_empty()
        || name
            .chars()
            .any(|c| c == '=' || c == ';' || c.is_whitespace() || c.is_control());
    if invalid {
        return Err(ValidationError::InvalidCookieName(
            name.chars().take(50).collect::<String>(),
        ));
    }
    Ok(())
}
