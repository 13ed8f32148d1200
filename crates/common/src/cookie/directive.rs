use chrono::{DateTime, Utc};
use http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::warn;

use crate::{
    constants::DEFAULT_COOKIE_PATH,
    error::{BridgeError, Result},
    validation::validate_cookie_name,
};

/// IMF-fixdate, the only `Expires` format written downstream
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// `SameSite` attribute of a cookie directive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
    /// No (valid) `SameSite` attribute was present
    #[default]
    Unset,
}

impl SameSite {
    /// Attribute value as written in a header, `None` when unset
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Self::Strict => Some("Strict"),
            Self::Lax => Some("Lax"),
            Self::None => Some("None"),
            Self::Unset => None,
        }
    }
}

impl From<::cookie::SameSite> for SameSite {
    fn from(same_site: ::cookie::SameSite) -> Self {
        match same_site {
            ::cookie::SameSite::Strict => Self::Strict,
            ::cookie::SameSite::Lax => Self::Lax,
            ::cookie::SameSite::None => Self::None,
        }
    }
}

/// A single parsed `Set-Cookie` instruction
///
/// Directives built through [`CookieDirective::new`] or parsed from a header
/// always carry a valid cookie-name token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieDirective {
    pub name: String,
    pub value: String,
    pub path: String,
    pub domain: Option<String>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub expires: Option<DateTime<Utc>>,
    pub max_age: Option<i64>,
}

impl CookieDirective {
    /// Create a directive with default attributes (`Path=/`, no flags)
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_cookie_name(&name).map_err(|e| BridgeError::InvalidCookie(e.to_string()))?;

        Ok(Self {
            name,
            value: value.into(),
            path: DEFAULT_COOKIE_PATH.to_string(),
            domain: None,
            http_only: false,
            secure: false,
            same_site: SameSite::Unset,
            expires: None,
            max_age: None,
        })
    }

    /// Parse a raw `Set-Cookie` header value
    ///
    /// Attribute parsing is delegated to the `cookie` crate, which splits the
    /// pair on the first `=`, matches attribute names case-insensitively and
    /// ignores unknown or malformed attributes. On top of that a missing or
    /// non-absolute `Path` becomes `/`, and an empty `Domain` counts as absent.
    pub fn parse(raw: &str) -> Result<Self> {
        let parsed = ::cookie::Cookie::parse(raw).map_err(|e| {
            BridgeError::InvalidCookie(format!(
                "{}: {}",
                e,
                raw.chars().take(50).collect::<String>()
            ))
        })?;

        let mut directive = Self::new(parsed.name(), parsed.value())?;

        if let Some(path) = parsed.path().filter(|p| p.starts_with('/')) {
            directive.path = path.to_string();
        }
        directive.domain = parsed
            .domain()
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        directive.http_only = parsed.http_only().unwrap_or(false);
        directive.secure = parsed.secure().unwrap_or(false);
        directive.same_site = parsed.same_site().map(SameSite::from).unwrap_or_default();
        directive.max_age = parsed.max_age().map(|max_age| max_age.whole_seconds());
        directive.expires = parsed.expires_datetime().and_then(|at| {
            DateTime::<Utc>::from_timestamp(at.unix_timestamp(), at.nanosecond())
        });

        Ok(directive)
    }

    /// Set `domain` only when the upstream did not specify one
    pub fn apply_default_domain(&mut self, domain: &str) {
        if self.domain.is_none() && !domain.is_empty() {
            self.domain = Some(domain.to_string());
        }
    }

    /// Whether this directive tells the client to drop the cookie
    ///
    /// `Max-Age` takes precedence over `Expires`.
    pub fn is_removal(&self, now: DateTime<Utc>) -> bool {
        match (self.max_age, self.expires) {
            (Some(max_age), _) => max_age <= 0,
            (None, Some(expires)) => expires <= now,
            (None, None) => false,
        }
    }

    /// Render as a downstream `Set-Cookie` header value
    pub fn to_header_value(&self) -> Result<HeaderValue> {
        HeaderValue::from_str(&self.to_string())
            .map_err(|e| BridgeError::InvalidCookie(format!("{}: {}", self.name, e)))
    }
}

impl fmt::Display for CookieDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}", self.name, self.value, self.path)?;

        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        if let Some(expires) = &self.expires {
            write!(f, "; Expires={}", expires.format(HTTP_DATE_FORMAT))?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age)?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if let Some(same_site) = self.same_site.as_str() {
            write!(f, "; SameSite={}", same_site)?;
        }

        Ok(())
    }
}

impl FromStr for CookieDirective {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Parse every raw `Set-Cookie` value in order, applying the default domain
///
/// Headers that cannot be parsed are logged and skipped; they never fail the
/// surrounding call.
pub fn parse_set_cookie_headers(
    raw_headers: &[String],
    default_domain: Option<&str>,
) -> Vec<CookieDirective> {
    raw_headers
        .iter()
        .filter_map(|raw| match CookieDirective::parse(raw) {
            Ok(mut directive) => {
                if let Some(domain) = default_domain {
                    directive.apply_default_domain(domain);
                }
                Some(directive)
            }
            Err(e) => {
                warn!("Dropping upstream Set-Cookie header: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_session_cookie() {
        let directive = CookieDirective::parse("session=abc123; Path=/; HttpOnly; Secure").unwrap();

        assert_eq!(directive.name, "session");
        assert_eq!(directive.value, "abc123");
        assert_eq!(directive.path, "/");
        assert!(directive.http_only);
        assert!(directive.secure);
        assert_eq!(directive.domain, None);
        assert_eq!(directive.same_site, SameSite::Unset);
        assert_eq!(directive.expires, None);
        assert_eq!(directive.max_age, None);
    }

    #[test]
    fn test_roundtrip_is_idempotent() {
        let raw = "session=abc123; Path=/; HttpOnly; Secure";
        let directive = CookieDirective::parse(raw).unwrap();
        let reparsed = CookieDirective::parse(&directive.to_string()).unwrap();
        assert_eq!(reparsed, directive);

        let full = "token=x; Domain=example.com; Path=/api; Expires=Wed, 21 Oct 2015 07:28:00 GMT; Max-Age=3600; HttpOnly; SameSite=Lax";
        let directive = CookieDirective::parse(full).unwrap();
        let rendered = directive.to_string();
        assert_eq!(
            rendered,
            "token=x; Path=/api; Domain=example.com; Expires=Wed, 21 Oct 2015 07:28:00 GMT; Max-Age=3600; HttpOnly; SameSite=Lax"
        );
        assert_eq!(CookieDirective::parse(&rendered).unwrap(), directive);
    }

    #[test]
    fn test_value_may_contain_equals() {
        let directive = CookieDirective::parse("jwt=eyJhbGciOi==; Path=/").unwrap();
        assert_eq!(directive.name, "jwt");
        assert_eq!(directive.value, "eyJhbGciOi==");
    }

    #[test]
    fn test_empty_value_is_allowed() {
        let directive = CookieDirective::parse("session=; Max-Age=0").unwrap();
        assert_eq!(directive.value, "");
        assert_eq!(directive.max_age, Some(0));
    }

    #[test]
    fn test_attribute_names_case_insensitive() {
        let directive = CookieDirective::parse(
            "a=1; path=/x; DOMAIN=example.com; httponly; SECURE; samesite=strict; max-age=60",
        )
        .unwrap();

        assert_eq!(directive.path, "/x");
        assert_eq!(directive.domain.as_deref(), Some("example.com"));
        assert!(directive.http_only);
        assert!(directive.secure);
        assert_eq!(directive.same_site, SameSite::Strict);
        assert_eq!(directive.max_age, Some(60));
    }

    #[test]
    fn test_expires_attribute() {
        let directive =
            CookieDirective::parse("a=1; Expires=Wed, 21 Oct 2015 07:28:00 GMT").unwrap();
        assert_eq!(
            directive.expires,
            Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap())
        );
    }

    #[test]
    fn test_malformed_and_unknown_attributes_ignored() {
        let directive = CookieDirective::parse(
            "a=1; Expires=someday; Max-Age=soon; SameSite=Sometimes; Priority=High; Partitioned; Path=relative",
        )
        .unwrap();

        assert_eq!(directive.expires, None);
        assert_eq!(directive.max_age, None);
        assert_eq!(directive.same_site, SameSite::Unset);
        assert_eq!(directive.path, "/");
        assert_eq!(directive.to_string(), "a=1; Path=/");
    }

    #[test]
    fn test_invalid_cookie_pairs() {
        assert!(CookieDirective::parse("").is_err());
        assert!(CookieDirective::parse("novalue").is_err());
        assert!(CookieDirective::parse("=value").is_err());
        assert!(CookieDirective::parse("bad name=value").is_err());
    }

    #[test]
    fn test_default_domain_only_when_absent() {
        let headers = vec!["a=1".to_string(), "b=2; Domain=example.com".to_string()];

        let directives = parse_set_cookie_headers(&headers, Some("localhost"));
        assert_eq!(directives[0].domain.as_deref(), Some("localhost"));
        assert_eq!(directives[1].domain.as_deref(), Some("example.com"));

        let directives = parse_set_cookie_headers(&headers, None);
        assert_eq!(directives[0].domain, None);
    }

    #[test]
    fn test_parse_headers_preserves_order_and_skips_invalid() {
        let headers = vec![
            "session=first".to_string(),
            "garbage".to_string(),
            "session=second".to_string(),
        ];

        let directives = parse_set_cookie_headers(&headers, None);
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].value, "first");
        assert_eq!(directives[1].value, "second");
    }

    #[test]
    fn test_names_outside_token_charset_are_kept() {
        let headers = vec!["cart[1]=x; Path=/".to_string(), "user:id=7".to_string()];

        let directives = parse_set_cookie_headers(&headers, None);
        let names: Vec<_> = directives.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["cart[1]", "user:id"]);
        assert_eq!(directives[1].value, "7");
    }

    #[test]
    fn test_utf8_value() {
        let directive = CookieDirective::parse("lang=café; Path=/").unwrap();
        assert_eq!(directive.value, "café");
        assert_eq!(directive.to_string(), "lang=café; Path=/");
        assert!(directive.to_header_value().is_ok());
    }

    #[test]
    fn test_lowercase_expires_attribute() {
        let directive =
            CookieDirective::parse("a=1; expires=Wed, 21 Oct 2015 07:28:00 GMT; max-age=-5").unwrap();
        assert_eq!(
            directive.expires,
            Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap())
        );
        assert!(directive.max_age.is_some_and(|max_age| max_age <= 0));
    }

    #[test]
    fn test_empty_domain_is_absent() {
        let directive = CookieDirective::parse("a=1; Domain=").unwrap();
        assert_eq!(directive.domain, None);

        let directives = parse_set_cookie_headers(&["a=1; Domain=".to_string()], Some("localhost"));
        assert_eq!(directives[0].domain.as_deref(), Some("localhost"));
    }

    #[test]
    fn test_is_removal() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let logout = CookieDirective::parse("session=; Max-Age=0").unwrap();
        assert!(logout.is_removal(now));

        let expired = CookieDirective::parse("session=x; Expires=Thu, 01 Jan 1970 00:00:00 GMT").unwrap();
        assert!(expired.is_removal(now));

        // Max-Age wins over a past Expires
        let refreshed = CookieDirective::parse(
            "session=x; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=600",
        )
        .unwrap();
        assert!(!refreshed.is_removal(now));

        let plain = CookieDirective::new("session", "x").unwrap();
        assert!(!plain.is_removal(now));
    }

    #[test]
    fn test_to_header_value() {
        let directive = CookieDirective::parse("a=1; Secure").unwrap();
        let value = directive.to_header_value().unwrap();
        assert_eq!(value.to_str().unwrap(), "a=1; Path=/; Secure");
    }

    #[test]
    fn test_from_str() {
        let directive: CookieDirective = "a=1; SameSite=none".parse().unwrap();
        assert_eq!(directive.same_site, SameSite::None);
    }
}
