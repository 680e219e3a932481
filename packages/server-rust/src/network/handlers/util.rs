//! Autocomplete pass-through routes under `<prefix>/util/`.
//!
//! Each route reads a couple of query parameters, calls one action, and
//! reshapes its list result for the widgets that consume it.

use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;
use catalog_core::{ApiVersion, CallPayload, PayloadValue, ResponseEnvelope};
use serde_json::{json, Map, Value};

use super::{framer_for, path_version, AppState};
use crate::dispatch::{taxonomy, ContentKind, MultiValueParams, ResponseBody};

/// Highest version the util routes accept.
pub const MAX_UTIL_VERSION: u8 = 2;

/// How a route wraps the action's list result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// `{"ResultSet": {"Result": [...]}}`
    ResultSet,
    /// Like `ResultSet`, with each item wrapped as `{<field>: item}`.
    ResultSetOf(&'static str),
    /// The list as returned.
    Plain,
}

/// An optional query parameter forwarded to the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passthrough {
    /// Forwarded only when non-empty.
    IfPresent(&'static str),
    /// Always forwarded, `false` when absent.
    Flag(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct AutocompleteRoute {
    /// Path below `<prefix>/util/`.
    pub path: &'static str,
    pub action: &'static str,
    /// Query parameter holding the partial input.
    pub query_param: &'static str,
    pub default_limit: u32,
    pub passthrough: &'static [Passthrough],
    pub shape: ResultShape,
}

pub static AUTOCOMPLETE_ROUTES: [AutocompleteRoute; 6] = [
    AutocompleteRoute {
        path: "dataset/autocomplete",
        action: "package_autocomplete",
        query_param: "incomplete",
        default_limit: 10,
        passthrough: &[],
        shape: ResultShape::ResultSet,
    },
    AutocompleteRoute {
        path: "user/autocomplete",
        action: "user_autocomplete",
        query_param: "q",
        default_limit: 20,
        passthrough: &[Passthrough::Flag("ignore_self")],
        shape: ResultShape::Plain,
    },
    AutocompleteRoute {
        path: "tag/autocomplete",
        action: "tag_autocomplete",
        query_param: "incomplete",
        default_limit: 10,
        passthrough: &[Passthrough::IfPresent("vocabulary_id")],
        shape: ResultShape::ResultSetOf("Name"),
    },
    AutocompleteRoute {
        path: "group/autocomplete",
        action: "group_autocomplete",
        query_param: "q",
        default_limit: 20,
        passthrough: &[],
        shape: ResultShape::Plain,
    },
    AutocompleteRoute {
        path: "organization/autocomplete",
        action: "organization_autocomplete",
        query_param: "q",
        default_limit: 20,
        passthrough: &[],
        shape: ResultShape::Plain,
    },
    AutocompleteRoute {
        path: "resource/format_autocomplete",
        action: "format_autocomplete",
        query_param: "incomplete",
        default_limit: 5,
        passthrough: &[],
        shape: ResultShape::ResultSetOf("Format"),
    },
];

impl AutocompleteRoute {
    /// Action payload for the query, or `None` when the partial input is empty.
    #[must_use]
    pub fn payload(&self, query: &MultiValueParams) -> Option<CallPayload> {
        let partial = query.first(self.query_param).filter(|q| !q.is_empty())?;

        let mut payload = CallPayload::new();
        payload.insert("q", partial);
        let limit = query.first("limit").map_or_else(
            || PayloadValue::Json(json!(self.default_limit)),
            PayloadValue::from,
        );
        payload.insert("limit", limit);
        for param in self.passthrough {
            match *param {
                Passthrough::IfPresent(name) => {
                    if let Some(value) = query.first(name).filter(|v| !v.is_empty()) {
                        payload.insert(name, value);
                    }
                }
                Passthrough::Flag(name) => {
                    let value = query
                        .first(name)
                        .map_or(PayloadValue::Json(Value::Bool(false)), PayloadValue::from);
                    payload.insert(name, value);
                }
            }
        }
        Some(payload)
    }

    /// Wraps the action's result (empty list when nothing was looked up).
    #[must_use]
    pub fn shape(&self, items: Value) -> Value {
        match self.shape {
            ResultShape::Plain => items,
            ResultShape::ResultSet => json!({ "ResultSet": { "Result": items } }),
            ResultShape::ResultSetOf(field) => {
                let wrapped: Vec<Value> = match items {
                    Value::Array(items) => items
                        .into_iter()
                        .map(|item| keyed(field, item))
                        .collect(),
                    other => vec![keyed(field, other)],
                };
                json!({ "ResultSet": { "Result": wrapped } })
            }
        }
    }
}

fn keyed(field: &str, item: Value) -> Value {
    let mut object = Map::new();
    object.insert(field.to_string(), item);
    Value::Object(object)
}

/// `GET <prefix>/util/<path>`.
pub async fn autocomplete(
    route: &'static AutocompleteRoute,
    state: AppState,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    run(route, &state, ApiVersion::V1, &method, &uri, &headers).await
}

/// `GET <prefix>/{ver}/util/<path>`.
pub async fn versioned_autocomplete(
    route: &'static AutocompleteRoute,
    state: AppState,
    ver: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    match path_version(&ver, 1, MAX_UTIL_VERSION) {
        Ok(version) => run(route, &state, version, &method, &uri, &headers).await,
        Err(not_found) => not_found,
    }
}

async fn run(
    route: &AutocompleteRoute,
    state: &AppState,
    version: ApiVersion,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
) -> Response {
    let framer = framer_for(method, uri);
    let query = uri
        .query()
        .map(|q| MultiValueParams::parse(q.as_bytes()))
        .unwrap_or_default();

    let Some(payload) = route.payload(&query) else {
        return framer.ok(
            ResponseBody::Json(route.shape(Value::Array(Vec::new()))),
            ContentKind::Json,
        );
    };

    let identity = state.caller(headers);
    match state
        .dispatcher
        .invoke_direct(route.action, version, identity, &payload)
        .await
    {
        Ok(items) => framer.ok(ResponseBody::Json(route.shape(items)), ContentKind::Json),
        Err(None) => framer.bad_request(Some(&format!("Action name not known: {}", route.action))),
        Err(Some(err)) => {
            let (status, record) = taxonomy::classify(&err, &payload);
            framer.envelope(status, &ResponseEnvelope::failure(None, record))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path: &str) -> &'static AutocompleteRoute {
        AUTOCOMPLETE_ROUTES
            .iter()
            .find(|r| r.path == path)
            .unwrap()
    }

    fn query(q: &str) -> MultiValueParams {
        MultiValueParams::parse(q.as_bytes())
    }

    #[test]
    fn empty_input_builds_no_payload() {
        let r = route("dataset/autocomplete");
        assert!(r.payload(&query("")).is_none());
        assert!(r.payload(&query("incomplete=")).is_none());
        assert!(r.payload(&query("q=census")).is_none());
    }

    #[test]
    fn default_and_explicit_limits() {
        let r = route("resource/format_autocomplete");
        let payload = r.payload(&query("incomplete=cs")).unwrap();
        assert_eq!(payload.to_json(), json!({"q": "cs", "limit": 5}));

        let payload = r.payload(&query("incomplete=cs&limit=2")).unwrap();
        assert_eq!(payload.to_json(), json!({"q": "cs", "limit": "2"}));
    }

    #[test]
    fn passthrough_parameters() {
        let tag = route("tag/autocomplete");
        let payload = tag.payload(&query("incomplete=ec&vocabulary_id=")).unwrap();
        assert!(!payload.contains_key("vocabulary_id"));
        let payload = tag.payload(&query("incomplete=ec&vocabulary_id=v1")).unwrap();
        assert_eq!(payload.get_str("vocabulary_id"), Some("v1"));

        let user = route("user/autocomplete");
        let payload = user.payload(&query("q=al")).unwrap();
        assert_eq!(payload.to_json()["ignore_self"], json!(false));
        assert_eq!(payload.to_json()["limit"], json!(20));
    }

    #[test]
    fn result_shapes() {
        let items = json!(["csv", "json"]);
        assert_eq!(
            route("resource/format_autocomplete").shape(items.clone()),
            json!({"ResultSet": {"Result": [{"Format": "csv"}, {"Format": "json"}]}})
        );
        assert_eq!(
            route("dataset/autocomplete").shape(items.clone()),
            json!({"ResultSet": {"Result": ["csv", "json"]}})
        );
        assert_eq!(route("group/autocomplete").shape(items.clone()), items);
        assert_eq!(
            route("tag/autocomplete").shape(json!([])),
            json!({"ResultSet": {"Result": []}})
        );
    }
}
