pub mod error;
pub mod handlers;
pub mod route;
pub mod server;

pub use error::ApiError;
pub use route::RouteProxy;
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
