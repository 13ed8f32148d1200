use serde_json::Value;

/// What came back from the upstream, before it is shaped into a `BridgeResult`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status_code: u16,

    /// Raw response body, `None` when the upstream sent nothing
    pub body: Option<Vec<u8>>,

    /// `Set-Cookie` header values in the order they were received
    pub raw_set_cookie_headers: Vec<String>,
}

impl UpstreamResponse {
    /// Create a new response with no body and no cookies
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        self.body = (!body.is_empty()).then_some(body);
        self
    }

    pub fn with_set_cookie(mut self, raw: impl Into<String>) -> Self {
        self.raw_set_cookie_headers.push(raw.into());
        self
    }

    /// Check if the response has a body
    pub fn has_body(&self) -> bool {
        self.body.as_ref().is_some_and(|body| !body.is_empty())
    }

    /// Body parsed as JSON; an empty or non-JSON body yields `None`
    pub fn json_body(&self) -> Option<Value> {
        self.body
            .as_deref()
            .filter(|body| !body.is_empty())
            .and_then(|body| serde_json::from_slice(body).ok())
    }

    /// Check if the response is successful (2xx status code)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Check if the response is a client error (4xx status code)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    /// Check if the response is a server error (5xx and above)
    pub fn is_server_error(&self) -> bool {
        self.status_code >= 500
    }
}
