//! Transport-neutral view of an incoming action call.

use std::collections::HashMap;

use axum::body::Body;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, Method, StatusCode};
use bytes::Bytes;
use catalog_core::{CallPayload, FileHandle, PayloadValue};

use super::extract::InputError;

const MULTIPART_FORM: &str = "multipart/form-data";
const URLENCODED_FORM: &str = "application/x-www-form-urlencoded";

/// Request method, classified by its payload semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMethod {
    Get,
    Head,
    Post,
    Put,
    Other,
}

impl TransportMethod {
    #[must_use]
    pub fn from_http(method: &Method) -> Self {
        match *method {
            Method::GET => Self::Get,
            Method::HEAD => Self::Head,
            Method::POST => Self::Post,
            Method::PUT => Self::Put,
            _ => Self::Other,
        }
    }

    /// Pure retrieval: the method has no body semantics.
    #[must_use]
    pub fn is_retrieval(self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }

    /// Whether form-encoded fields are read for this method.
    #[must_use]
    pub fn carries_form(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }

    /// Update methods must supply a non-empty payload.
    #[must_use]
    pub fn is_update(self) -> bool {
        matches!(self, Self::Put)
    }
}

/// Ordered, multi-valued `name=value` pairs (query string or form body).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiValueParams(Vec<(String, String)>);

impl MultiValueParams {
    /// Parses `application/x-www-form-urlencoded` text.
    #[must_use]
    pub fn parse(encoded: &[u8]) -> Self {
        Self(
            url::form_urlencoded::parse(encoded)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        )
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First value supplied for `name`.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Distinct field names, in order of first appearance.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.grouped().into_iter().map(|(name, _)| name).collect()
    }

    /// The field name when every pair uses the same one.
    #[must_use]
    pub fn single_name(&self) -> Option<&str> {
        let (first, _) = self.0.first()?;
        self.0
            .iter()
            .all(|(k, _)| k == first)
            .then_some(first.as_str())
    }

    /// Values grouped by name, names in order of first appearance. One pass.
    fn grouped(&self) -> Vec<(&str, Vec<&str>)> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(self.0.len());
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
        for (k, v) in &self.0 {
            let slot = *index.entry(k.as_str()).or_insert_with(|| {
                groups.push((k.as_str(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(v.as_str());
        }
        groups
    }

    /// Folds the pairs into a payload: a field given once becomes a string,
    /// a repeated field becomes the ordered list of its values.
    #[must_use]
    pub fn fold(&self) -> CallPayload {
        self.grouped()
            .into_iter()
            .map(|(name, values)| {
                let value = match values.as_slice() {
                    [only] => PayloadValue::Text((*only).to_string()),
                    _ => PayloadValue::List(values.into_iter().map(str::to_string).collect()),
                };
                (name.to_string(), value)
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MultiValueParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One received call. Immutable once built.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub method: TransportMethod,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub query: MultiValueParams,
    pub form: MultiValueParams,
    /// Uploaded parts, by form field name.
    pub files: Vec<(String, FileHandle)>,
}

impl CallRequest {
    #[must_use]
    pub fn new(method: TransportMethod) -> Self {
        Self {
            method,
            content_type: None,
            body: Bytes::new(),
            query: MultiValueParams::default(),
            form: MultiValueParams::default(),
            files: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = MultiValueParams::parse(query.as_bytes());
        self
    }

    #[must_use]
    pub fn with_body(mut self, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.content_type = Some(content_type.to_string());
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_form(mut self, form: MultiValueParams) -> Self {
        self.content_type = Some(URLENCODED_FORM.to_string());
        self.form = form;
        self
    }

    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, file: FileHandle) -> Self {
        self.content_type = Some(MULTIPART_FORM.to_string());
        self.files.push((name.into(), file));
        self
    }

    /// JSONP callback name from the query string.
    #[must_use]
    pub fn callback(&self) -> Option<&str> {
        self.query.first("callback")
    }

    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with(MULTIPART_FORM))
    }

    /// Reads an HTTP request into a `CallRequest`.
    ///
    /// Url-encoded bodies are decoded into form fields. Multipart bodies are
    /// split into plain fields (form) and parts carrying a file name (files).
    /// Any other body is kept as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `InputError::TooLarge` when the body exceeds the configured
    /// limit, or `InputError::Unreadable` if the body or a multipart field
    /// cannot be read.
    pub async fn from_http(request: Request<Body>) -> Result<Self, InputError> {
        let method = TransportMethod::from_http(request.method());
        let content_type = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let query = request
            .uri()
            .query()
            .map(|q| MultiValueParams::parse(q.as_bytes()))
            .unwrap_or_default();

        let mut call = Self {
            method,
            content_type,
            body: Bytes::new(),
            query,
            form: MultiValueParams::default(),
            files: Vec::new(),
        };

        if call.is_multipart() {
            let mut multipart = Multipart::from_request(request, &())
                .await
                .map_err(|e| read_failure(e.status(), e.body_text()))?;
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| read_failure(e.status(), e.body_text()))?
            {
                let name = field.name().unwrap_or_default().to_string();
                match field.file_name().map(str::to_string) {
                    Some(filename) => {
                        let part_type = field.content_type().map(str::to_string);
                        let data = field
                            .bytes()
                            .await
                            .map_err(|e| read_failure(e.status(), e.body_text()))?;
                        call.files
                            .push((name, FileHandle::new(Some(filename), part_type, data)));
                    }
                    None => {
                        let text = field
                            .text()
                            .await
                            .map_err(|e| read_failure(e.status(), e.body_text()))?;
                        call.form.push(name, text);
                    }
                }
            }
            return Ok(call);
        }

        let body = Bytes::from_request(request, &())
            .await
            .map_err(|e| read_failure(e.status(), e.body_text()))?;
        let is_urlencoded = call
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with(URLENCODED_FORM));
        if is_urlencoded {
            call.form = MultiValueParams::parse(&body);
        } else {
            call.body = body;
        }
        Ok(call)
    }
}

fn read_failure(status: StatusCode, detail: String) -> InputError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        InputError::TooLarge
    } else {
        InputError::Unreadable(detail)
    }
}
