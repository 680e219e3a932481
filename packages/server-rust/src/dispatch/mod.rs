//! Action dispatch pipeline.
//!
//! 1. **Request** (`request`): transport request -> `CallRequest`
//! 2. **Extraction** (`extract`): `CallRequest` -> `CallPayload`
//! 3. **Orchestration** (`orchestrator`): resolve, invoke, build the envelope
//! 4. **Taxonomy** (`taxonomy`): `ActionError` -> `(__type, message, status)`
//! 5. **Framing** (`framer`): envelope -> wire response, with JSONP support

pub mod extract;
pub mod framer;
pub mod orchestrator;
pub mod request;
pub mod taxonomy;

pub use extract::{extract, InputError};
pub use framer::{ContentKind, FramerError, ResponseBody, ResponseFramer};
pub use orchestrator::Dispatcher;
pub use request::{CallRequest, MultiValueParams, TransportMethod};
