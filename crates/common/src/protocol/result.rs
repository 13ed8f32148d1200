use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::UpstreamResponse;
use crate::{
    cookie::{CookieDirective, parse_set_cookie_headers},
    error::Result,
};

/// Why a forward call did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Upstream unreachable, connection reset, or timed out
    NetworkError,
    /// Upstream answered 4xx
    ClientError,
    /// Upstream answered 5xx
    ServerError,
    /// A structured body was required but the upstream sent something else
    ParseError,
}

impl ErrorKind {
    /// Map an upstream status code; `None` for anything below 400
    pub fn from_status(status_code: u16) -> Option<Self> {
        match status_code {
            0..=399 => None,
            400..=499 => Some(ErrorKind::ClientError),
            _ => Some(ErrorKind::ServerError),
        }
    }

    /// Whether repeating the same request could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::NetworkError | ErrorKind::ServerError)
    }
}

/// Per-call switches for `forward`
///
/// There is intentionally no `Default`: whether cookies are relayed must be
/// chosen by the caller or taken from process configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardOptions {
    /// Relay the inbound `Cookie` header upstream and upstream `Set-Cookie` back
    pub forward_cookies: bool,

    /// Treat a non-empty, non-JSON success body as `ParseError`
    pub require_json_body: bool,
}

impl ForwardOptions {
    pub fn new(forward_cookies: bool) -> Self {
        Self {
            forward_cookies,
            require_json_body: false,
        }
    }

    pub fn with_cookies() -> Self {
        Self::new(true)
    }

    pub fn without_cookies() -> Self {
        Self::new(false)
    }

    pub fn require_json_body(mut self) -> Self {
        self.require_json_body = true;
        self
    }
}

/// The uniform outcome of one forward call
///
/// Only the constructors below produce values, so a result is either a
/// success with its status and body, or a failure with an `ErrorKind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    body: Option<Value>,
    outbound_cookies: Vec<CookieDirective>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<ErrorKind>,
}

impl BridgeResult {
    /// The upstream could not be reached; there is no status, body or cookie
    pub fn network_error() -> Self {
        Self {
            success: false,
            status_code: None,
            body: None,
            outbound_cookies: Vec::new(),
            error_kind: Some(ErrorKind::NetworkError),
        }
    }

    /// Shape an upstream response according to the status and cookie rules
    ///
    /// `Set-Cookie` headers are relayed regardless of status when
    /// `options.forward_cookies` is set; `default_cookie_domain` is applied to
    /// directives that carry no `Domain`.
    pub fn from_upstream(
        response: &UpstreamResponse,
        options: &ForwardOptions,
        default_cookie_domain: Option<&str>,
    ) -> Self {
        let outbound_cookies = if options.forward_cookies {
            parse_set_cookie_headers(&response.raw_set_cookie_headers, default_cookie_domain)
        } else {
            Vec::new()
        };

        let status_code = response.status_code;
        let body = response.json_body();

        let error_kind = ErrorKind::from_status(status_code).or_else(|| {
            (options.require_json_body && response.has_body() && body.is_none())
                .then_some(ErrorKind::ParseError)
        });

        Self {
            success: error_kind.is_none(),
            status_code: Some(status_code),
            body,
            outbound_cookies,
            error_kind,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Upstream status code; `None` only for network failures
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn outbound_cookies(&self) -> &[CookieDirective] {
        &self.outbound_cookies
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    /// Take the cookie directives, e.g. to write them onto a downstream response
    pub fn take_outbound_cookies(&mut self) -> Vec<CookieDirective> {
        std::mem::take(&mut self.outbound_cookies)
    }

    /// A human-readable message the upstream put in its body, if any
    ///
    /// Looks at `message`, `error` and `detail` string fields, and at
    /// `error.message` for nested error objects.
    pub fn server_message(&self) -> Option<&str> {
        let body = self.body.as_ref()?;

        ["message", "error", "detail"]
            .iter()
            .find_map(|key| body.get(key).and_then(Value::as_str))
            .or_else(|| body.pointer("/error/message").and_then(Value::as_str))
    }

    /// Deserialize the body into a typed value; an absent body reads as `null`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.body.clone().unwrap_or(Value::Null);
        Ok(serde_json::from_value(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_result() {
        let response = UpstreamResponse::new(200).with_body(r#"{"id":7}"#);
        let result = BridgeResult::from_upstream(&response, &ForwardOptions::with_cookies(), None);

        assert!(result.is_success());
        assert_eq!(result.status_code(), Some(200));
        assert_eq!(result.body(), Some(&json!({"id": 7})));
        assert_eq!(result.error_kind(), None);
    }

    #[test]
    fn test_status_mapping() {
        let options = ForwardOptions::with_cookies();

        let result = BridgeResult::from_upstream(&UpstreamResponse::new(401), &options, None);
        assert!(!result.is_success());
        assert_eq!(result.error_kind(), Some(ErrorKind::ClientError));
        assert_eq!(result.status_code(), Some(401));

        let result = BridgeResult::from_upstream(&UpstreamResponse::new(500), &options, None);
        assert_eq!(result.error_kind(), Some(ErrorKind::ServerError));

        let result = BridgeResult::from_upstream(&UpstreamResponse::new(204), &options, None);
        assert!(result.is_success());
        assert_eq!(result.body(), None);

        let result = BridgeResult::from_upstream(&UpstreamResponse::new(302), &options, None);
        assert!(result.is_success());
    }

    #[test]
    fn test_error_body_is_surfaced() {
        let response = UpstreamResponse::new(422).with_body(r#"{"message":"Email already taken"}"#);
        let result = BridgeResult::from_upstream(&response, &ForwardOptions::with_cookies(), None);

        assert_eq!(result.error_kind(), Some(ErrorKind::ClientError));
        assert_eq!(result.server_message(), Some("Email already taken"));
    }

    #[test]
    fn test_cookie_gate() {
        let response = UpstreamResponse::new(200)
            .with_set_cookie("session=abc; HttpOnly")
            .with_set_cookie("csrf=xyz");

        let result =
            BridgeResult::from_upstream(&response, &ForwardOptions::without_cookies(), None);
        assert!(result.outbound_cookies().is_empty());

        let result = BridgeResult::from_upstream(&response, &ForwardOptions::with_cookies(), None);
        let names: Vec<_> = result
            .outbound_cookies()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["session", "csrf"]);
    }

    #[test]
    fn test_cookies_relayed_on_error_status() {
        let response = UpstreamResponse::new(401).with_set_cookie("session=; Max-Age=0");
        let result = BridgeResult::from_upstream(&response, &ForwardOptions::with_cookies(), None);

        assert!(!result.is_success());
        assert_eq!(result.outbound_cookies().len(), 1);
        assert_eq!(result.outbound_cookies()[0].max_age, Some(0));
    }

    #[test]
    fn test_default_cookie_domain() {
        let response = UpstreamResponse::new(200)
            .with_set_cookie("a=1")
            .with_set_cookie("a=1; Domain=example.com");
        let result = BridgeResult::from_upstream(
            &response,
            &ForwardOptions::with_cookies(),
            Some("localhost"),
        );

        assert_eq!(
            result.outbound_cookies()[0].domain.as_deref(),
            Some("localhost")
        );
        assert_eq!(
            result.outbound_cookies()[1].domain.as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn test_non_json_body_is_not_an_error() {
        let response = UpstreamResponse::new(200).with_body("plain text");
        let result = BridgeResult::from_upstream(&response, &ForwardOptions::with_cookies(), None);

        assert!(result.is_success());
        assert_eq!(result.body(), None);
    }

    #[test]
    fn test_required_json_body() {
        let options = ForwardOptions::with_cookies().require_json_body();

        let garbled = UpstreamResponse::new(200).with_body("{\"id\": 1,");
        let result = BridgeResult::from_upstream(&garbled, &options, None);
        assert!(!result.is_success());
        assert_eq!(result.error_kind(), Some(ErrorKind::ParseError));
        assert_eq!(result.status_code(), Some(200));

        // An empty body is absent, not garbled
        let empty = UpstreamResponse::new(204);
        let result = BridgeResult::from_upstream(&empty, &options, None);
        assert!(result.is_success());

        // Status mapping wins over parse failures
        let html_error = UpstreamResponse::new(502).with_body("<html>Bad Gateway</html>");
        let result = BridgeResult::from_upstream(&html_error, &options, None);
        assert_eq!(result.error_kind(), Some(ErrorKind::ServerError));
    }

    #[test]
    fn test_network_error() {
        let result = BridgeResult::network_error();

        assert!(!result.is_success());
        assert_eq!(result.error_kind(), Some(ErrorKind::NetworkError));
        assert_eq!(result.status_code(), None);
        assert!(result.outbound_cookies().is_empty());
        assert!(ErrorKind::NetworkError.is_retryable());
        assert!(!ErrorKind::ClientError.is_retryable());
    }

    #[test]
    fn test_server_message_variants() {
        let nested = UpstreamResponse::new(400).with_body(r#"{"error":{"message":"bad token"}}"#);
        let result = BridgeResult::from_upstream(&nested, &ForwardOptions::with_cookies(), None);
        assert_eq!(result.server_message(), Some("bad token"));

        let flat = UpstreamResponse::new(403).with_body(r#"{"detail":"forbidden"}"#);
        let result = BridgeResult::from_upstream(&flat, &ForwardOptions::with_cookies(), None);
        assert_eq!(result.server_message(), Some("forbidden"));

        assert_eq!(BridgeResult::network_error().server_message(), None);
    }

    #[test]
    fn test_typed_body() {
        #[derive(Deserialize)]
        struct User {
            id: u64,
            username: String,
        }

        let response =
            UpstreamResponse::new(200).with_body(r#"{"id":3,"username":"bob","extra":true}"#);
        let result = BridgeResult::from_upstream(&response, &ForwardOptions::with_cookies(), None);

        let user: User = result.json().unwrap();
        assert_eq!(user.id, 3);
        assert_eq!(user.username, "bob");

        let empty = BridgeResult::from_upstream(
            &UpstreamResponse::new(204),
            &ForwardOptions::with_cookies(),
            None,
        );
        let nothing: Option<User> = empty.json().unwrap();
        assert!(nothing.is_none());
        assert!(empty.json::<User>().is_err());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_value(BridgeResult::network_error()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_kind"], "network_error");
        assert!(json.get("status_code").is_none());
    }
}
