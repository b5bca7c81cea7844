//! REST API layer: error mapping, auth middleware, route handlers,
//! router assembly, and server lifecycle.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use server::ApiServer;
pub use types::{ApiContext, AuthContext};
