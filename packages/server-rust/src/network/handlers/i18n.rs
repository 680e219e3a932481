//! Front-end translation catalogues.

use std::io::ErrorKind;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use tracing::error;

use super::util::MAX_UTIL_VERSION;
use super::{framer_for, path_version, AppState};
use crate::dispatch::{ContentKind, ResponseBody, ResponseFramer};

/// `GET <prefix>/i18n/{lang}`.
pub async fn translations_handler(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    method: Method,
    uri: Uri,
) -> Response {
    translations(&state, &lang, &framer_for(&method, &uri)).await
}

/// `GET <prefix>/{ver}/i18n/{lang}`.
pub async fn versioned_translations_handler(
    State(state): State<AppState>,
    Path((ver, lang)): Path<(String, String)>,
    method: Method,
    uri: Uri,
) -> Response {
    match path_version(&ver, 1, MAX_UTIL_VERSION) {
        Ok(_) => translations(&state, &lang, &framer_for(&method, &uri)).await,
        Err(not_found) => not_found,
    }
}

/// Serves `<i18n_dir>/<lang>.js` as JSON text. Only configured locales are
/// looked up, so `lang` never reaches the filesystem unchecked.
async fn translations(state: &AppState, lang: &str, framer: &ResponseFramer) -> Response {
    if !state.gateway.locales.iter().any(|l| l == lang) {
        return framer.bad_request(Some(&format!("Unknown locale: {lang}")));
    }

    let source = state.gateway.i18n_dir.join(format!("{lang}.js"));
    match tokio::fs::read_to_string(&source).await {
        Ok(text) => framer.ok(ResponseBody::Text(text), ContentKind::Json),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            framer.ok(ResponseBody::Text("{}".to_string()), ContentKind::Json)
        }
        Err(e) => {
            error!(path = %source.display(), error = %e, "failed to read translations");
            framer.frame(
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(ResponseBody::Text("Internal Server Error".to_string())),
                ContentKind::Text,
                HeaderMap::new(),
            )
        }
    }
}
