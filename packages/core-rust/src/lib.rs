//! Catalog gateway core: call payloads, invocation context, the `Action` trait,
//! and the response envelope shared by every transport.

pub mod context;
pub mod envelope;
pub mod error;
pub mod traits;
pub mod types;

pub use context::{ApiVersion, ChangedEntities, Identity, InvocationContext, Principal};
pub use envelope::{ErrorRecord, ResponseEnvelope};
pub use error::{ActionError, ErrorKind};
pub use traits::{serialize_result, Action};
pub use types::{CallPayload, FileHandle, PayloadValue};
