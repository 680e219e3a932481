//! Payload extraction: turns a [`CallRequest`] into the canonical [`CallPayload`].
//!
//! Sources are tried in priority order: form fields (including the legacy
//! single-field JSON encoding), query parameters (read-only actions only),
//! then a JSON body. Uploaded files are merged in last.

use catalog_core::{CallPayload, PayloadValue};
use serde_json::Value;
use tracing::debug;

use super::request::{CallRequest, MultiValueParams};

/// Malformed or unacceptable call input. Always answered with HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Invalid request: method not allowed for this payload extraction mode. Please use the POST method for your request")]
    MethodNotAllowed,

    #[error("Error decoding JSON data. Error: {error} JSON data extracted from the request: {raw:?}")]
    MalformedJson { error: String, raw: String },

    #[error("Request data JSON decoded to {0} but it needs to be a dictionary.")]
    NotAMapping(String),

    #[error("Invalid request: update requires a non-empty payload")]
    EmptyUpdate,

    #[error("Unable to read request data: {0}")]
    Unreadable(String),

    #[error("Request body exceeds the configured size limit")]
    TooLarge,
}

/// Extracts the call payload.
///
/// `allow_query_params` is set for side-effect-free actions; it permits
/// retrieval methods and lets query parameters act as the payload.
///
/// # Errors
///
/// Returns `InputError` when the method is not allowed, the JSON is
/// malformed or not an object, or an update call carries no data.
pub fn extract(request: &CallRequest, allow_query_params: bool) -> Result<CallPayload, InputError> {
    if !allow_query_params && request.method.is_retrieval() {
        return Err(InputError::MethodNotAllowed);
    }

    let mut payload = if request.method.carries_form() && !request.form.is_empty() {
        from_form(&request.form)?
    } else if allow_query_params && !request.query.is_empty() {
        request.query.fold()
    } else if !request.body.is_empty() && !request.is_multipart() {
        parse_document(&request.body)?
    } else {
        CallPayload::new()
    };

    if request.method.is_update() && payload.is_empty() {
        return Err(InputError::EmptyUpdate);
    }

    for (name, file) in &request.files {
        payload.insert(name.clone(), PayloadValue::File(file.clone()));
    }

    debug!(?payload, "request data extracted");
    Ok(payload)
}

/// Form fields, or the JSON document smuggled in as the only field name
/// (`{"q":"x"}=1` or `{"q":"x"}=`).
fn from_form(form: &MultiValueParams) -> Result<CallPayload, InputError> {
    if let Some(only) = form.single_name() {
        if matches!(form.first(only), Some("1" | "")) {
            return parse_document(only.as_bytes());
        }
    }
    Ok(form.fold())
}

fn parse_document(raw: &[u8]) -> Result<CallPayload, InputError> {
    let document: Value = serde_json::from_slice(raw).map_err(|e| InputError::MalformedJson {
        error: e.to_string(),
        raw: String::from_utf8_lossy(raw).into_owned(),
    })?;
    CallPayload::from_json(document).map_err(|other| InputError::NotAMapping(other.to_string()))
}
