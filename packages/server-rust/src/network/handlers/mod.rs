//! Axum handlers and the shared state they receive.

pub mod api;
pub mod health;
pub mod i18n;
pub mod util;

pub use api::{action_handler, root_handler, versioned_action_handler, versioned_root_handler};
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use i18n::{translations_handler, versioned_translations_handler};
pub use util::AUTOCOMPLETE_ROUTES;

use std::sync::Arc;
use std::time::Instant;

use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use catalog_core::{ApiVersion, Identity};

use super::auth::IdentityResolver;
use super::lifecycle::Lifecycle;
use super::NetworkConfig;
use crate::dispatch::{Dispatcher, ResponseFramer, TransportMethod};
use crate::service::GatewayConfig;

/// Shared application state passed to all handlers via `State` extraction.
///
/// Every member is behind an `Arc`, so cloning per request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub gateway: Arc<GatewayConfig>,
    pub network: Arc<NetworkConfig>,
    pub identity: Arc<dyn IdentityResolver>,
    pub lifecycle: Arc<Lifecycle>,
    /// Process start time, used for uptime.
    pub start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        network: NetworkConfig,
        identity: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            gateway: Arc::clone(dispatcher.config()),
            dispatcher,
            network: Arc::new(network),
            identity,
            lifecycle: Arc::new(Lifecycle::new()),
            start_time: Instant::now(),
        }
    }

    fn caller(&self, headers: &HeaderMap) -> Identity {
        self.identity.resolve(headers)
    }
}

fn framer_for(method: &Method, uri: &Uri) -> ResponseFramer {
    ResponseFramer::for_query(TransportMethod::from_http(method), uri.query())
}

/// Parses the `{ver}` path segment, or answers 404 when it is out of range.
fn path_version(segment: &str, min: u8, max: u8) -> Result<ApiVersion, Response> {
    ApiVersion::parse_within(segment, min..=max).ok_or_else(|| StatusCode::NOT_FOUND.into_response())
}
