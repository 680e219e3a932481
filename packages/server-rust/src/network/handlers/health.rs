//! Health, liveness, and readiness endpoint handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::network::lifecycle::HealthState;

/// Detailed health as JSON. Always 200; `state` carries the actual health.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "state": state.lifecycle.health_state().as_str(),
        "actions": state.dispatcher.registry().len(),
        "in_flight": state.lifecycle.in_flight_count(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Liveness check: 200 whenever the process can answer.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness check: 200 only in the `Ready` state, 503 otherwise.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.lifecycle.health_state() == HealthState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::dispatch::Dispatcher;
    use crate::network::auth::AnonymousResolver;
    use crate::network::NetworkConfig;
    use crate::service::{register_builtins, ActionRegistry, GatewayConfig};

    fn test_state() -> AppState {
        let registry = Arc::new(ActionRegistry::new());
        let config = Arc::new(GatewayConfig::default());
        register_builtins(&registry, &config);
        AppState::new(
            Arc::new(Dispatcher::new(registry, config)),
            NetworkConfig::default(),
            Arc::new(AnonymousResolver),
        )
    }

    #[tokio::test]
    async fn health_reports_state_and_counts() {
        let state = test_state();
        state.lifecycle.set_ready();
        let _guard = state.lifecycle.in_flight_guard();

        let json = health_handler(State(state)).await.0;
        assert_eq!(json["state"], "ready");
        assert_eq!(json["actions"], 2);
        assert_eq!(json["in_flight"], 1);
        assert!(json["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn liveness_always_ok() {
        assert_eq!(liveness_handler().await, StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_follows_lifecycle() {
        let state = test_state();
        assert_eq!(
            readiness_handler(State(state.clone())).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        state.lifecycle.set_ready();
        assert_eq!(readiness_handler(State(state.clone())).await, StatusCode::OK);
        state.lifecycle.begin_drain();
        assert_eq!(
            readiness_handler(State(state)).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
