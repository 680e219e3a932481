//! Action registry, gateway configuration, and the built-in actions.

pub mod builtin;
pub mod config;
pub mod registry;

pub use builtin::{register_builtins, HelpShow, StatusShow};
pub use config::GatewayConfig;
pub use registry::ActionRegistry;
