mod request;
mod response;
mod result;

pub use request::{Method, RequestBody, RequestDescriptor};
pub use response::UpstreamResponse;
pub use result::{BridgeResult, ErrorKind, ForwardOptions};
