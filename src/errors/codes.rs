use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Stable, machine-readable error identifiers exposed to API clients.
///
/// Clients branch on the string form, so a shipped code must never be
/// renamed or reused for a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed
    ValidationError,

    /// Authentication missing or invalid
    Unauthorized,

    /// Authenticated but not allowed
    Forbidden,

    /// Record or endpoint does not exist
    ResourceNotFound,

    /// Request conflicts with current resource state
    ResourceConflict,

    /// Too many requests / rate limit exceeded
    RateLimitExceeded,

    /// Access token past its expiry
    TokenExpired,

    /// Access token malformed or badly signed
    TokenInvalid,

    /// Persistence layer failure
    DatabaseError,

    /// Internal server error
    InternalServerError,

    /// Dependency or maintenance outage
    ServiceUnavailable,
}

impl ErrorCode {
    /// Every registered code, in declaration order.
    pub const ALL: [ErrorCode; 11] = [
        Self::ValidationError,
        Self::Unauthorized,
        Self::Forbidden,
        Self::ResourceNotFound,
        Self::ResourceConflict,
        Self::RateLimitExceeded,
        Self::TokenExpired,
        Self::TokenInvalid,
        Self::DatabaseError,
        Self::InternalServerError,
        Self::ServiceUnavailable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::ResourceConflict => "RESOURCE_CONFLICT",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    /// HTTP status normally paired with this code
    pub fn default_status(&self) -> u16 {
        match self {
            Self::ValidationError => 422,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => 401,
            Self::Forbidden => 403,
            Self::ResourceNotFound => 404,
            Self::ResourceConflict => 409,
            Self::RateLimitExceeded => 429,
            Self::DatabaseError | Self::InternalServerError => 500,
            Self::ServiceUnavailable => 503,
        }
    }

    /// Client-facing message used when nothing more specific is known
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "The given data was invalid.",
            Self::Unauthorized => "Authentication required.",
            Self::Forbidden => "You do not have permission to perform this action.",
            Self::ResourceNotFound => "The requested resource was not found.",
            Self::ResourceConflict => {
                "The request conflicts with the current state of the resource."
            }
            Self::RateLimitExceeded => "Too many requests. Please slow down.",
            Self::TokenExpired => "The access token has expired.",
            Self::TokenInvalid => "The access token is invalid.",
            Self::DatabaseError => "A database error occurred.",
            Self::InternalServerError => "An unexpected error occurred.",
            Self::ServiceUnavailable => "The service is temporarily unavailable.",
        }
    }

    /// Pick the code for a bare HTTP status.
    ///
    /// Unlisted statuses collapse to `INTERNAL_SERVER_ERROR`.
    pub fn for_status(status: u16) -> Self {
        match status {
            400 => Self::ValidationError,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::ResourceNotFound,
            409 => Self::ResourceConflict,
            429 => Self::RateLimitExceeded,
            500 => Self::InternalServerError,
            503 => Self::ServiceUnavailable,
            _ => Self::InternalServerError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
