//! HTTP plumbing shared by every backend call.
//!
//! SYSTEM CONTEXT
//! ==============
//! One [`HttpPipeline`] instance serves the whole application. Callers get
//! the parsed payload on success and never see the transport envelope.

pub mod error;
pub mod pipeline;

pub use error::{ApiError, ErrorKind};
pub use pipeline::{AUTH_HEADER, HttpPipeline, JSON_CONTENT_TYPE, PipelineRequest, RequestBody};
