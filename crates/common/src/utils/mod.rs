mod headers;
mod id;

pub use headers::{append_set_cookies, has_header, inbound_cookie_header, set_cookie_headers};
pub use id::generate_request_id;
