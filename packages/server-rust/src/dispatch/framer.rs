//! Response framing: body serialization, content types, JSONP wrapping.

use std::fmt::Display;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use catalog_core::ResponseEnvelope;
use serde_json::Value;
use tracing::error;

use super::request::{MultiValueParams, TransportMethod};

/// Media type family of a framed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Html,
    Json,
    Javascript,
}

impl ContentKind {
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Text => "text/plain;charset=utf-8",
            Self::Html => "text/html;charset=utf-8",
            Self::Json => "application/json;charset=utf-8",
            Self::Javascript => "application/javascript;charset=utf-8",
        }
    }
}

/// Response body before serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Structured value, encoded as JSON.
    Json(Value),
    /// Text passed through as-is (including pre-encoded JSON).
    Text(String),
}

impl ResponseBody {
    fn render(self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Text(text) => text,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FramerError {
    #[error("Couldn't convert 'Location' header value '{location}' to string: {reason}")]
    Location { location: String, reason: String },
}

impl IntoResponse for FramerError {
    fn into_response(self) -> Response {
        error!(error = %self, "failed to frame response");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, ContentKind::Text.media_type())],
            "Internal Server Error",
        )
            .into_response()
    }
}

/// Frames responses for one request.
///
/// Carries the JSONP callback when the request asked for one with a
/// retrieval method; it is applied to 200 responses only.
#[derive(Debug, Clone, Default)]
pub struct ResponseFramer {
    jsonp_callback: Option<String>,
}

impl ResponseFramer {
    #[must_use]
    pub fn new(method: TransportMethod, query: &MultiValueParams) -> Self {
        let jsonp_callback = if method.is_retrieval() {
            query.first("callback").map(escape_callback)
        } else {
            None
        };
        Self { jsonp_callback }
    }

    /// Framer for a raw query string (`None` when the URI had no query).
    #[must_use]
    pub fn for_query(method: TransportMethod, query: Option<&str>) -> Self {
        let params = query
            .map(|q| MultiValueParams::parse(q.as_bytes()))
            .unwrap_or_default();
        Self::new(method, &params)
    }

    /// Builds the transport response.
    #[must_use]
    pub fn frame(
        &self,
        status: StatusCode,
        body: Option<ResponseBody>,
        kind: ContentKind,
        mut headers: HeaderMap,
    ) -> Response {
        let Some(body) = body else {
            return (status, headers).into_response();
        };

        let mut content_type = kind.media_type();
        let mut message = body.render();
        if status == StatusCode::OK {
            if let Some(callback) = &self.jsonp_callback {
                message = wrap_jsonp(callback, &message);
                content_type = ContentKind::Javascript.media_type();
            }
        }
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        (status, headers, message).into_response()
    }

    /// 200 with the given body.
    #[must_use]
    pub fn ok(&self, body: ResponseBody, kind: ContentKind) -> Response {
        self.frame(StatusCode::OK, Some(body), kind, HeaderMap::new())
    }

    /// 201 with a `Location` header pointing at the new resource.
    ///
    /// # Errors
    ///
    /// Returns `FramerError::Location` if the location cannot be used as a
    /// header value. The failure is never dropped silently.
    pub fn created(
        &self,
        body: ResponseBody,
        kind: ContentKind,
        location: &impl Display,
    ) -> Result<Response, FramerError> {
        let location = location.to_string();
        let value = HeaderValue::from_str(&location).map_err(|e| FramerError::Location {
            location: location.clone(),
            reason: e.to_string(),
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, value);
        Ok(self.frame(StatusCode::CREATED, Some(body), kind, headers))
    }

    /// 400 with `"Bad request"`, optionally followed by ` - <extra>`.
    #[must_use]
    pub fn bad_request(&self, extra: Option<&str>) -> Response {
        let message = match extra {
            Some(extra) => format!("Bad request - {extra}"),
            None => "Bad request".to_string(),
        };
        self.frame(
            StatusCode::BAD_REQUEST,
            Some(ResponseBody::Json(Value::String(message))),
            ContentKind::Json,
            HeaderMap::new(),
        )
    }

    /// Frames an action envelope as JSON.
    #[must_use]
    pub fn envelope(&self, status: StatusCode, envelope: &ResponseEnvelope) -> Response {
        self.frame(
            status,
            Some(ResponseBody::Json(envelope.to_json())),
            ContentKind::Json,
            HeaderMap::new(),
        )
    }
}

/// Escapes a client-supplied callback name so it cannot break out of the script.
fn escape_callback(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn wrap_jsonp(callback: &str, body: &str) -> String {
    format!("{callback}({body});")
}
