use std::collections::BTreeMap;

use serde_json::Value;

/// Failure category of an action call.
///
/// The server maps each kind to a wire label and HTTP status; the mapping is
/// part of the external contract and does not vary per action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Payload could not be turned into a well-formed domain object.
    Integrity,
    NotAuthorized,
    NotFound,
    /// Field-level validation failed.
    Validation,
    /// The search backend rejected the query syntax.
    SearchQuery,
    Search,
    /// Writing to the search index failed.
    SearchIndex,
    /// The search backend could not be reached.
    SearchConnection,
    Internal,
}

/// Errors raised by actions.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("integrity error: {message}")]
    Integrity { message: String },

    #[error("not authorized{}", suffix(cause.as_deref()))]
    NotAuthorized { cause: Option<String> },

    #[error("not found{}", suffix(cause.as_deref()))]
    NotFound { cause: Option<String> },

    #[error("validation failed on {} field(s)", errors.len())]
    Validation { errors: BTreeMap<String, Value> },

    #[error("search query is invalid: {0}")]
    SearchQuery(String),

    #[error("search error: {0}")]
    Search(String),

    #[error("search index error: {0}")]
    SearchIndex(String),

    #[error("unable to connect to the search server")]
    SearchConnection,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn suffix(cause: Option<&str>) -> String {
    cause.map(|c| format!(": {c}")).unwrap_or_default()
}

impl ActionError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::NotAuthorized { .. } => ErrorKind::NotAuthorized,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::SearchQuery(_) => ErrorKind::SearchQuery,
            Self::Search(_) => ErrorKind::Search,
            Self::SearchIndex(_) => ErrorKind::SearchIndex,
            Self::SearchConnection => ErrorKind::SearchConnection,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_authorized() -> Self {
        Self::NotAuthorized { cause: None }
    }

    pub fn not_authorized_because(cause: impl Into<String>) -> Self {
        Self::NotAuthorized {
            cause: Some(cause.into()),
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::NotFound { cause: None }
    }

    pub fn not_found_because(cause: impl Into<String>) -> Self {
        Self::NotFound {
            cause: Some(cause.into()),
        }
    }

    /// Builds a validation error from `(field, messages)` pairs.
    pub fn validation<I, K, V>(errors: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Validation {
            errors: errors
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
