use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr};

use crate::{
    constants::JSON_CONTENT_TYPE,
    error::{BridgeError, Result},
    utils::has_header,
    validation::{ValidationError, sanitize_header_name, sanitize_header_value, validate_path},
};

/// HTTP methods the bridge forwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            other => Err(ValidationError::UnsupportedMethod(other.to_string()).into()),
        }
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Delete => http::Method::DELETE,
            Method::Patch => http::Method::PATCH,
        }
    }
}

/// Payload of an outgoing call
///
/// JSON payloads are serialized when the descriptor is built, so sending never
/// has to deal with serialization errors.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Already-serialized JSON document
    Json(Vec<u8>),

    /// Sent byte-for-byte, e.g. a multipart form the caller already encoded
    Raw(Vec<u8>),
}

impl RequestBody {
    pub fn is_json(&self) -> bool {
        matches!(self, RequestBody::Json(_))
    }

    /// Bytes to put on the wire
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RequestBody::Json(bytes) | RequestBody::Raw(bytes) => bytes,
        }
    }
}

/// Caller-supplied description of one upstream call
///
/// The path is validated on construction and every header is sanitized as it
/// is added, so a built descriptor is always safe to forward. Header names are
/// stored lowercase.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    path: String,
    method: Method,
    headers: HashMap<String, String>,
    body: Option<RequestBody>,
    inbound_cookie_header: Option<String>,
}

impl RequestDescriptor {
    /// Create a descriptor for `method` on a path relative to the upstream base URL
    pub fn new(method: Method, path: &str) -> Result<Self> {
        Ok(Self {
            path: validate_path(path)?,
            method,
            headers: HashMap::new(),
            body: None,
            inbound_cookie_header: None,
        })
    }

    pub fn get(path: &str) -> Result<Self> {
        Self::new(Method::Get, path)
    }

    pub fn post(path: &str) -> Result<Self> {
        Self::new(Method::Post, path)
    }

    pub fn put(path: &str) -> Result<Self> {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: &str) -> Result<Self> {
        Self::new(Method::Delete, path)
    }

    pub fn patch(path: &str) -> Result<Self> {
        Self::new(Method::Patch, path)
    }

    /// Add a header, replacing any previous value for the same name
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = sanitize_header_name(name)?;
        let value = sanitize_header_value(value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Attach a JSON body built from any serializable value
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(RequestBody::Json(serde_json::to_vec(body)?));
        Ok(self)
    }

    /// Attach an already-encoded body that must not be re-serialized
    pub fn with_raw_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(RequestBody::Raw(body.into()));
        self
    }

    /// Attach the `Cookie` header the caller received from its own client
    pub fn with_inbound_cookies(mut self, cookie_header: &str) -> Result<Self> {
        let sanitized = sanitize_header_value(cookie_header)?;
        let trimmed = sanitized.trim();
        self.inbound_cookie_header = (!trimmed.is_empty()).then(|| trimmed.to_string());
        Ok(self)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn inbound_cookie_header(&self) -> Option<&str> {
        self.inbound_cookie_header.as_deref()
    }

    /// Check if the request has a body
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Headers to send upstream, excluding `Cookie`
    ///
    /// A JSON body gets `Content-Type: application/json` unless the caller set
    /// a content type. Caller-supplied `Cookie` headers are dropped; the cookie
    /// gate in the bridge decides what (if anything) is sent instead.
    pub fn outgoing_headers(&self) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter(|(name, _)| name.as_str() != "cookie")
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let needs_content_type = self.body.as_ref().is_some_and(RequestBody::is_json)
            && !has_header(&self.headers, "content-type");
        if needs_content_type {
            headers.push(("content-type".to_string(), JSON_CONTENT_TYPE.to_string()));
        }

        headers.sort();
        headers
    }
}
