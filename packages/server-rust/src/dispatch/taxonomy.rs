//! Maps action errors onto the stable `(__type, message, status)` contract.

use axum::http::StatusCode;
use catalog_core::{ActionError, CallPayload, ErrorKind, ErrorRecord};
use tracing::{error, info};

/// How the `message` member of an error record is composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    /// The action's own detail message, plus the call data under `data`.
    DetailWithData,
    /// Base message, followed by `: <cause>` when the action gave one.
    BaseWithCause,
    /// No message; the action's per-field errors are merged into the record.
    FieldErrors,
    /// Base message immediately followed by the action's detail.
    BaseWithDetail,
    /// Base message only.
    Fixed,
}

/// One row of the taxonomy.
#[derive(Debug, Clone, Copy)]
pub struct TaxonomyEntry {
    pub kind: ErrorKind,
    pub label: &'static str,
    pub status: StatusCode,
    pub base_message: &'static str,
    pub composition: Composition,
}

const INTERNAL: TaxonomyEntry = TaxonomyEntry {
    kind: ErrorKind::Internal,
    label: "Internal Server Error",
    status: StatusCode::INTERNAL_SERVER_ERROR,
    base_message: "Internal Server Error",
    composition: Composition::Fixed,
};

/// Evaluated top to bottom; the first entry whose kind matches wins.
pub const TAXONOMY: [TaxonomyEntry; 9] = [
    TaxonomyEntry {
        kind: ErrorKind::Integrity,
        label: "Integrity Error",
        status: StatusCode::BAD_REQUEST,
        base_message: "",
        composition: Composition::DetailWithData,
    },
    TaxonomyEntry {
        kind: ErrorKind::NotAuthorized,
        label: "Authorization Error",
        status: StatusCode::FORBIDDEN,
        base_message: "Access denied",
        composition: Composition::BaseWithCause,
    },
    TaxonomyEntry {
        kind: ErrorKind::NotFound,
        label: "Not Found Error",
        status: StatusCode::NOT_FOUND,
        base_message: "Not found",
        composition: Composition::BaseWithCause,
    },
    TaxonomyEntry {
        kind: ErrorKind::Validation,
        label: "Validation Error",
        status: StatusCode::CONFLICT,
        base_message: "",
        composition: Composition::FieldErrors,
    },
    TaxonomyEntry {
        kind: ErrorKind::SearchQuery,
        label: "Search Query Error",
        status: StatusCode::BAD_REQUEST,
        base_message: "Search Query is invalid: ",
        composition: Composition::BaseWithDetail,
    },
    TaxonomyEntry {
        kind: ErrorKind::Search,
        label: "Search Error",
        status: StatusCode::CONFLICT,
        base_message: "Search error: ",
        composition: Composition::BaseWithDetail,
    },
    TaxonomyEntry {
        kind: ErrorKind::SearchIndex,
        label: "Search Index Error",
        status: StatusCode::INTERNAL_SERVER_ERROR,
        base_message: "Unable to add package to search index: ",
        composition: Composition::BaseWithDetail,
    },
    TaxonomyEntry {
        kind: ErrorKind::SearchConnection,
        label: "Search Connection Error",
        status: StatusCode::INTERNAL_SERVER_ERROR,
        base_message: "Unable to connect to the search server",
        composition: Composition::Fixed,
    },
    INTERNAL,
];

/// Finds the taxonomy entry for `kind`, falling back to the internal-error row.
#[must_use]
pub fn lookup(kind: ErrorKind) -> &'static TaxonomyEntry {
    TAXONOMY
        .iter()
        .find(|entry| entry.kind == kind)
        .unwrap_or(&INTERNAL)
}

/// Label for a kind, as sent in `__type`.
#[must_use]
pub fn label(kind: ErrorKind) -> &'static str {
    lookup(kind).label
}

/// Converts an action error into the status and error record to send.
///
/// `payload` is the call data the action received; integrity errors echo it.
/// Internal errors are logged in full and answered with a generic message.
#[must_use]
pub fn classify(err: &ActionError, payload: &CallPayload) -> (StatusCode, ErrorRecord) {
    let entry = lookup(err.kind());
    let record = match entry.composition {
        Composition::DetailWithData => {
            let detail = match err {
                ActionError::Integrity { message } => message.clone(),
                other => other.to_string(),
            };
            info!(error = %detail, ?payload, "format incorrect");
            ErrorRecord::new(entry.label, detail).with_extra("data", payload.to_json())
        }
        Composition::BaseWithCause => {
            let cause = match err {
                ActionError::NotAuthorized { cause } | ActionError::NotFound { cause } => {
                    cause.as_deref()
                }
                _ => None,
            };
            info!(error_type = entry.label, cause, "action refused");
            let message = match cause {
                Some(cause) if !cause.is_empty() => format!("{}: {cause}", entry.base_message),
                _ => entry.base_message.to_string(),
            };
            ErrorRecord::new(entry.label, message)
        }
        Composition::FieldErrors => {
            let mut record = ErrorRecord::bare(entry.label);
            if let ActionError::Validation { errors } = err {
                info!(errors = ?errors, "validation error");
                // `__type` always carries the label.
                for (field, messages) in errors.iter().filter(|(field, _)| *field != "__type") {
                    record.extra.insert(field.clone(), messages.clone());
                }
            }
            record
        }
        Composition::BaseWithDetail => {
            let detail = match err {
                ActionError::SearchQuery(d) | ActionError::Search(d) | ActionError::SearchIndex(d) => {
                    d.clone()
                }
                other => other.to_string(),
            };
            info!(error_type = entry.label, detail = %detail, "search failure");
            ErrorRecord::new(entry.label, format!("{}{detail}", entry.base_message))
        }
        Composition::Fixed => {
            if entry.kind == ErrorKind::Internal {
                error!(error = ?err, "action raised an unexpected error");
            } else {
                info!(error_type = entry.label, "action failed");
            }
            ErrorRecord::new(entry.label, entry.base_message)
        }
    };
    (entry.status, record)
}

/// Record for an action name missing from the registry.
#[must_use]
pub fn unknown_action(name: &str) -> ErrorRecord {
    ErrorRecord::new(
        label(ErrorKind::Validation),
        format!("Action name not known: {name}"),
    )
}

/// Record for call input rejected before the action runs.
#[must_use]
pub fn input_error(details: &impl std::fmt::Display) -> ErrorRecord {
    ErrorRecord::new(label(ErrorKind::Validation), format!("Input Error: {details}"))
}
