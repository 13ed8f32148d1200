//! Common types for the session bridge
//!
//! This crate holds the I/O-free half of the bridge: request descriptors,
//! upstream responses, cookie directive parsing and rendering, the uniform
//! bridge result, and the header helpers callers use on the downstream side.

pub mod constants;
pub mod cookie;
pub mod error;
pub mod protocol;
pub mod utils;
pub mod validation;

// Re-export commonly used types for convenience
pub use cookie::{CookieDirective, SameSite};
pub use error::{BridgeError, Result};
pub use protocol::{
    BridgeResult, ErrorKind, ForwardOptions, Method, RequestBody, RequestDescriptor,
    UpstreamResponse,
};
pub use utils::{
    append_set_cookies, generate_request_id, has_header, inbound_cookie_header,
    set_cookie_headers,
};
