use http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, SET_COOKIE},
};
use std::collections::HashMap;
use tracing::warn;

use crate::cookie::CookieDirective;

/// Case-insensitive lookup in a plain header map
pub fn has_header(headers: &HashMap<String, String>, name: &str) -> bool {
    headers.keys().any(|key| key.eq_ignore_ascii_case(name))
}

/// The inbound `Cookie` header to relay upstream
///
/// HTTP/2 clients may split cookies over several `Cookie` headers; they are
/// joined with `"; "` into a single value.
pub fn inbound_cookie_header(headers: &HeaderMap) -> Option<String> {
    let parts: Vec<&str> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| decode_header_value(COOKIE.as_str(), value))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect();

    (!parts.is_empty()).then(|| parts.join("; "))
}

/// All `Set-Cookie` values, in received order
///
/// Values are decoded as UTF-8, so non-ASCII cookie values survive. Only bytes
/// that are not valid UTF-8 are logged and skipped.
pub fn set_cookie_headers(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| decode_header_value(SET_COOKIE.as_str(), value))
        .map(str::to_string)
        .collect()
}

// `HeaderValue::to_str` rejects every byte above 0x7F, valid UTF-8 included
fn decode_header_value<'a>(name: &str, value: &'a HeaderValue) -> Option<&'a str> {
    match std::str::from_utf8(value.as_bytes()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("Skipping {} header that is not UTF-8: {}", name, e);
            None
        }
    }
}

/// Append one `Set-Cookie` header per directive to a downstream response
///
/// Returns how many headers were written; directives that do not render to a
/// valid header value are logged and skipped.
pub fn append_set_cookies(headers: &mut HeaderMap, cookies: &[CookieDirective]) -> usize {
    let mut written = 0;

    for cookie in cookies {
        match cookie.to_header_value() {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
                written += 1;
            }
            Err(e) => warn!("Skipping downstream Set-Cookie: {}", e),
        }
    }

    written
}
