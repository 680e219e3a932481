//! API root and action call routes.

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{Method, Uri};
use axum::response::Response;
use catalog_core::ApiVersion;
use serde_json::json;

use super::{framer_for, path_version, AppState};
use crate::dispatch::{ContentKind, ResponseBody};

/// Smallest version the versioned action route accepts.
const MIN_ACTION_VERSION: u8 = 3;

/// `GET <prefix>/`: reports API version 1.
pub async fn root_handler(method: Method, uri: Uri) -> Response {
    version_response(&method, &uri, ApiVersion::V1)
}

/// `GET <prefix>/{ver}`.
pub async fn versioned_root_handler(
    State(state): State<AppState>,
    Path(ver): Path<String>,
    method: Method,
    uri: Uri,
) -> Response {
    match path_version(&ver, 1, state.gateway.max_api_version.get()) {
        Ok(version) => version_response(&method, &uri, version),
        Err(not_found) => not_found,
    }
}

fn version_response(method: &Method, uri: &Uri, version: ApiVersion) -> Response {
    framer_for(method, uri).ok(
        ResponseBody::Json(json!({ "version": version })),
        ContentKind::Json,
    )
}

/// `GET|POST <prefix>/action/{name}` at the default API version.
pub async fn action_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    request: Request<Body>,
) -> Response {
    let version = state.gateway.default_api_version;
    call(&state, &name, version, request).await
}

/// `GET|POST <prefix>/{ver}/action/{name}`.
pub async fn versioned_action_handler(
    State(state): State<AppState>,
    Path((ver, name)): Path<(String, String)>,
    request: Request<Body>,
) -> Response {
    match path_version(&ver, MIN_ACTION_VERSION, state.gateway.max_api_version.get()) {
        Ok(version) => call(&state, &name, version, request).await,
        Err(not_found) => not_found,
    }
}

async fn call(state: &AppState, name: &str, version: ApiVersion, request: Request<Body>) -> Response {
    let _in_flight = state.lifecycle.in_flight_guard();
    let identity = state.caller(request.headers());
    state.dispatcher.dispatch(name, version, identity, request).await
}
