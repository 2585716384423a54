use axum::http::StatusCode;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, warn};

use super::codes::ErrorCode;
use super::context::RequestContext;
use super::failure::{ApiFailure, FailureKind, SourceLocation};
use crate::config::Environment;
use crate::envelope::{ApiResponse, EnvelopeBuilder};

/// Outcome chosen for one failed request
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Always an error status, 400..=599
    pub status: u16,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<Value>,
    pub meta: Option<Map<String, Value>>,
}

impl Classification {
    fn new(status: u16, error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            error_code,
            message: message.into(),
            details: None,
            meta: None,
        }
    }

    fn fixed(error_code: ErrorCode) -> Self {
        Self::new(
            error_code.default_status(),
            error_code,
            error_code.default_message(),
        )
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn severity(&self) -> Severity {
        Severity::for_status(self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn for_status(status: u16) -> Self {
        if status < 500 {
            Self::Warning
        } else {
            Self::Error
        }
    }
}

/// Everything recorded about a classified failure
#[derive(Debug)]
pub struct FailureLogEntry<'a> {
    pub severity: Severity,
    pub failure_type: &'static str,
    pub message: String,
    pub origin: &'a SourceLocation,
    pub status: u16,
    pub error_code: ErrorCode,
    pub context: &'a RequestContext,
    /// Sanitized request body, non-production only
    pub body: Option<&'a Value>,
}

/// Sink for classification log entries
pub trait FailureLogger: Send + Sync {
    fn log(&self, entry: &FailureLogEntry<'_>);
}

/// Writes each entry as a structured `tracing` event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFailureLogger;

impl FailureLogger for TracingFailureLogger {
    fn log(&self, entry: &FailureLogEntry<'_>) {
        let ctx = entry.context;
        let body = entry.body.map(Value::to_string).unwrap_or_default();
        match entry.severity {
            Severity::Warning => warn!(
                failure_type = entry.failure_type,
                error_code = %entry.error_code,
                status = entry.status,
                origin = %entry.origin,
                method = %ctx.method,
                url = %ctx.url,
                ip = ctx.ip.as_deref().unwrap_or("unknown"),
                user_agent = ctx.user_agent.as_deref().unwrap_or("unknown"),
                user_id = ctx.user_id.as_deref().unwrap_or("guest"),
                request_id = ctx.request_id.as_deref().unwrap_or(""),
                body = %body,
                "API failure: {}",
                entry.message
            ),
            Severity::Error => error!(
                failure_type = entry.failure_type,
                error_code = %entry.error_code,
                status = entry.status,
                origin = %entry.origin,
                method = %ctx.method,
                url = %ctx.url,
                ip = ctx.ip.as_deref().unwrap_or("unknown"),
                user_agent = ctx.user_agent.as_deref().unwrap_or("unknown"),
                user_id = ctx.user_id.as_deref().unwrap_or("guest"),
                request_id = ctx.request_id.as_deref().unwrap_or(""),
                body = %body,
                "API failure: {}",
                entry.message
            ),
        }
    }
}

/// Maps any [`ApiFailure`] to a [`Classification`] and logs it once.
#[derive(Clone)]
pub struct Classifier {
    environment: Environment,
    logger: Arc<dyn FailureLogger>,
}

impl Classifier {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            logger: Arc::new(TracingFailureLogger),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn FailureLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Classify and log. Total over every failure kind.
    pub fn classify(&self, failure: &ApiFailure, ctx: &RequestContext) -> Classification {
        let classification = self.map(failure, ctx);

        let body = if self.environment.is_production() {
            None
        } else {
            ctx.body.as_ref()
        };
        self.logger.log(&FailureLogEntry {
            severity: classification.severity(),
            failure_type: failure.kind().name(),
            message: failure.to_string(),
            origin: failure.origin(),
            status: classification.status,
            error_code: classification.error_code,
            context: ctx,
            body,
        });

        classification
    }

    /// Classify, log, and build the failure envelope
    pub fn respond(
        &self,
        builder: &EnvelopeBuilder,
        failure: &ApiFailure,
        ctx: &RequestContext,
    ) -> ApiResponse {
        let classification = self.classify(failure, ctx);
        let status = classification.status_code();
        builder.failure_at(
            failure.origin().clone(),
            ctx,
            classification.message,
            classification.details,
            status,
            Some(classification.error_code),
            classification.meta,
        )
    }

    fn map(&self, failure: &ApiFailure, ctx: &RequestContext) -> Classification {
        let production = self.environment.is_production();

        match failure.kind() {
            FailureKind::Validation { errors } => Classification::fixed(ErrorCode::ValidationError)
                .with_details(json!(errors)),

            FailureKind::Unauthenticated => Classification::fixed(ErrorCode::Unauthorized),

            FailureKind::Forbidden => Classification::fixed(ErrorCode::Forbidden),

            FailureKind::RecordNotFound { resource, ids } => {
                let identifier = ids.join(", ");
                Classification::new(
                    404,
                    ErrorCode::ResourceNotFound,
                    format!("{resource} with identifier '{identifier}' not found"),
                )
                .with_details(json!({ "resource": resource, "identifier": identifier }))
            }

            FailureKind::RouteNotFound => {
                Classification::new(404, ErrorCode::ResourceNotFound, "Endpoint not found")
                    .with_details(json!({ "resource": "Endpoint", "identifier": ctx.path }))
            }

            FailureKind::RateLimited { retry_after } => {
                let mut classification = Classification::fixed(ErrorCode::RateLimitExceeded);
                if let Some(seconds) = retry_after {
                    let mut meta = Map::new();
                    meta.insert("retry_after".to_string(), json!(seconds));
                    classification.meta = Some(meta);
                }
                classification
            }

            FailureKind::TokenExpired => Classification::fixed(ErrorCode::TokenExpired),

            FailureKind::TokenInvalid => Classification::fixed(ErrorCode::TokenInvalid),

            FailureKind::Database {
                message,
                query,
                bindings,
            } => {
                if production {
                    Classification::fixed(ErrorCode::DatabaseError)
                } else {
                    Classification::new(500, ErrorCode::DatabaseError, message.clone())
                        .with_details(json!({ "query": query, "bindings": bindings }))
                }
            }

            FailureKind::Http { status, message } => {
                let status = if (400..=599).contains(status) {
                    *status
                } else {
                    500
                };
                let message = message.clone().unwrap_or_else(|| {
                    StatusCode::from_u16(status)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or("Error")
                        .to_string()
                });
                Classification::new(status, ErrorCode::for_status(status), message)
            }

            FailureKind::Unclassified {
                type_name,
                message,
                trace,
            } => {
                if production {
                    Classification::fixed(ErrorCode::InternalServerError)
                } else {
                    Classification::new(500, ErrorCode::InternalServerError, message.clone())
                        .with_details(json!({
                            "exception": type_name,
                            "file": failure.origin().file,
                            "line": failure.origin().line,
                            "message": message,
                            "trace": trace,
                        }))
                }
            }
        }
    }
}
