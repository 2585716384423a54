use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::panic::Location;

/// Field name -> validation messages, in the order fields were checked
pub type FieldErrors = IndexMap<String, Vec<String>>;

/// Source position where a failure was raised
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }
}

impl From<&Location<'_>> for SourceLocation {
    fn from(location: &Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Every way a request can fail. The classifier matches on these tags,
/// never on message text.
#[derive(Debug, thiserror::Error)]
pub enum FailureKind {
    #[error("validation failed for {} field(s)", .errors.len())]
    Validation { errors: FieldErrors },

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("{resource} not found: {}", .ids.join(", "))]
    RecordNotFound { resource: String, ids: Vec<String> },

    #[error("route not found")]
    RouteNotFound,

    #[error("rate limit exceeded")]
    RateLimited { retry_after: Option<u64> },

    #[error("access token expired")]
    TokenExpired,

    #[error("access token invalid")]
    TokenInvalid,

    #[error("database error: {message}")]
    Database {
        message: String,
        query: Option<String>,
        bindings: Vec<Value>,
    },

    #[error("http error {status}")]
    Http { status: u16, message: Option<String> },

    #[error("{message}")]
    Unclassified {
        type_name: String,
        message: String,
        trace: Vec<String>,
    },
}

impl FailureKind {
    /// Short tag used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationFailure",
            Self::Unauthenticated => "AuthenticationFailure",
            Self::Forbidden => "AuthorizationFailure",
            Self::RecordNotFound { .. } => "RecordNotFound",
            Self::RouteNotFound => "RouteNotFound",
            Self::RateLimited { .. } => "RateLimitFailure",
            Self::TokenExpired => "TokenExpired",
            Self::TokenInvalid => "TokenInvalid",
            Self::Database { .. } => "PersistenceFailure",
            Self::Http { .. } => "HttpFailure",
            Self::Unclassified { .. } => "UnclassifiedFailure",
        }
    }
}

/// A typed request failure plus the place it was raised.
///
/// Handlers return these and let the classifier turn them into an
/// envelope; nothing else builds error responses.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct ApiFailure {
    kind: FailureKind,
    origin: SourceLocation,
}

impl ApiFailure {
    #[track_caller]
    pub fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            origin: SourceLocation::caller(),
        }
    }

    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    pub fn origin(&self) -> &SourceLocation {
        &self.origin
    }

    #[track_caller]
    pub fn validation(errors: FieldErrors) -> Self {
        Self::new(FailureKind::Validation { errors })
    }

    /// Single-field validation failure
    #[track_caller]
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.into()]);
        Self::validation(errors)
    }

    #[track_caller]
    pub fn unauthenticated() -> Self {
        Self::new(FailureKind::Unauthenticated)
    }

    #[track_caller]
    pub fn forbidden() -> Self {
        Self::new(FailureKind::Forbidden)
    }

    #[track_caller]
    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::new(FailureKind::RecordNotFound {
            resource: resource.into(),
            ids: vec![id.to_string()],
        })
    }

    #[track_caller]
    pub fn not_found_many<I, S>(resource: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self::new(FailureKind::RecordNotFound {
            resource: resource.into(),
            ids: ids.into_iter().map(|id| id.to_string()).collect(),
        })
    }

    #[track_caller]
    pub fn route_not_found() -> Self {
        Self::new(FailureKind::RouteNotFound)
    }

    #[track_caller]
    pub fn rate_limited(retry_after: Option<u64>) -> Self {
        Self::new(FailureKind::RateLimited { retry_after })
    }

    #[track_caller]
    pub fn token_expired() -> Self {
        Self::new(FailureKind::TokenExpired)
    }

    #[track_caller]
    pub fn token_invalid() -> Self {
        Self::new(FailureKind::TokenInvalid)
    }

    #[track_caller]
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Database {
            message: message.into(),
            query: None,
            bindings: Vec::new(),
        })
    }

    #[track_caller]
    pub fn database_query(
        message: impl Into<String>,
        query: impl Into<String>,
        bindings: Vec<Value>,
    ) -> Self {
        Self::new(FailureKind::Database {
            message: message.into(),
            query: Some(query.into()),
            bindings,
        })
    }

    #[track_caller]
    pub fn http(status: u16) -> Self {
        Self::new(FailureKind::Http {
            status,
            message: None,
        })
    }

    #[track_caller]
    pub fn http_with_message(status: u16, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Http {
            status,
            message: Some(message.into()),
        })
    }

    /// Wrap any error the classifier has no dedicated mapping for
    #[track_caller]
    pub fn unclassified<E>(err: E) -> Self
    where
        E: std::error::Error + 'static,
    {
        Self::new(FailureKind::Unclassified {
            type_name: std::any::type_name::<E>().to_string(),
            message: err.to_string(),
            trace: trace_lines(&Backtrace::capture()),
        })
    }
}

fn trace_lines(backtrace: &Backtrace) -> Vec<String> {
    if backtrace.status() != BacktraceStatus::Captured {
        return Vec::new();
    }
    backtrace
        .to_string()
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

impl From<FailureKind> for ApiFailure {
    #[track_caller]
    fn from(kind: FailureKind) -> Self {
        Self::new(kind)
    }
}

impl From<anyhow::Error> for ApiFailure {
    #[track_caller]
    fn from(err: anyhow::Error) -> Self {
        Self::new(FailureKind::Unclassified {
            type_name: "anyhow::Error".to_string(),
            message: format!("{err:#}"),
            trace: trace_lines(err.backtrace()),
        })
    }
}

impl From<serde_json::Error> for ApiFailure {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::unclassified(err)
    }
}

impl From<jsonwebtoken::errors::Error> for ApiFailure {
    #[track_caller]
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::token_expired(),
            _ => Self::token_invalid(),
        }
    }
}

impl From<JsonRejection> for ApiFailure {
    #[track_caller]
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_field("body", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiFailure {
    #[track_caller]
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_field("query", rejection.body_text())
    }
}

impl From<PathRejection> for ApiFailure {
    #[track_caller]
    fn from(rejection: PathRejection) -> Self {
        Self::invalid_field("path", rejection.body_text())
    }
}
