//! HTTP surface: configuration, middleware, identity resolution, handlers,
//! and the server lifecycle.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod module;

pub use auth::{AnonymousResolver, ApiTokenResolver, IdentityResolver, TokenConfigError};
pub use config::{NetworkConfig, TlsConfig};
pub use handlers::AppState;
pub use lifecycle::{HealthState, Lifecycle};
pub use module::{build_router, NetworkModule};
