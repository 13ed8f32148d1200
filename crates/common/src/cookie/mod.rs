mod directive;

pub use directive::{CookieDirective, SameSite, parse_set_cookie_headers};
