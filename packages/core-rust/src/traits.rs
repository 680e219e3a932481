use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::context::InvocationContext;
use crate::error::ActionError;
use crate::types::CallPayload;

/// A named unit of business logic resolved by name and invoked with `(context, payload)`.
///
/// Implementations may block on storage or search I/O; the gateway awaits the
/// call to completion and applies no timeout of its own.
#[async_trait]
pub trait Action: Send + Sync {
    /// Registry name, e.g. `"package_show"`.
    fn name(&self) -> &str;

    /// Whether the action only reads state. Read-only actions may take their
    /// input from query parameters.
    fn side_effect_free(&self) -> bool {
        false
    }

    /// Documentation served by `help_show`.
    fn help(&self) -> Option<&str> {
        None
    }

    /// Runs the action. Changed entity ids are reported through `ctx`.
    async fn invoke(
        &self,
        ctx: &mut InvocationContext,
        payload: &CallPayload,
    ) -> Result<Value, ActionError>;
}

/// Converts an action's typed output into the JSON result value.
///
/// Anything implementing `Serialize` describes its own JSON form; date/time
/// types with serde support render as ISO-8601 strings.
///
/// # Errors
///
/// Returns `ActionError::Internal` if the value cannot be serialized.
pub fn serialize_result<T: Serialize + ?Sized>(value: &T) -> Result<Value, ActionError> {
    serde_json::to_value(value).map_err(|e| ActionError::Internal(e.into()))
}
