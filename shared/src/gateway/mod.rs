// HTTP surface of the session subsystem

pub mod middleware;
pub mod routes;

pub use middleware::{bearer_token, require_session};
pub use routes::{GatewayState, router};
