mod container;
mod framer;
mod rate_limit;
mod response;
mod router;
mod server;
mod session;

pub use container::{Container, ContainerConfig};
pub use framer::{FrameState, ParsedRequest, RejectReason, RequestFramer, MAX_REQUEST_SIZE};
pub use rate_limit::RateLimiter;
pub use response::Response;
pub use router::Router;
pub use server::Server;
pub use session::SessionStore;
