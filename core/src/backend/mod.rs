//! Inference Endpoint Integration
//!
//! Abstracted access to the portal's inference endpoint through a common
//! trait interface, so the controller can be driven against the real HTTP
//! transport or a test mock.
//!
//! # Usage
//!
//! ```ignore
//! use pitchline_core::backend::{InferenceBackend, PortalBackend, PromptRequest, WireBody};
//!
//! let backend = PortalBackend::new("http://localhost:5000/process_prompt", WireBody::Prompt);
//! let request = PromptRequest::new("plan a launch", "llama3.2:1b");
//! let rx = backend.send_streaming(&request).await?;
//! ```

mod http;
mod traits;

pub use http::{PortalBackend, WireBody};
pub use traits::{InferenceBackend, OutputFormat, PromptRequest, StreamSignal};
