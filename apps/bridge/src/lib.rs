//! Cookie-forwarding request bridge
//!
//! A [`Bridge`] turns one [`RequestDescriptor`] into one upstream HTTP call,
//! relays the caller's session cookie upstream, and hands back a
//! [`BridgeResult`] with the upstream's `Set-Cookie` directives parsed and
//! normalized for the downstream client.

pub mod bridge;
pub mod config;


pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use session_bridge_common::{
    BridgeError, BridgeResult, CookieDirective, ErrorKind, ForwardOptions, Method, RequestBody,
    RequestDescriptor, Result, SameSite, UpstreamResponse,
};
