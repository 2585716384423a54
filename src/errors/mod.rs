//! Failure taxonomy, classification and the shared error-code registry

pub mod classifier;
pub mod codes;
pub mod context;
pub mod failure;

pub use classifier::{Classification, Classifier, FailureLogger, Severity, TracingFailureLogger};
pub use codes::ErrorCode;
pub use context::RequestContext;
pub use failure::{ApiFailure, FailureKind, FieldErrors, SourceLocation};
