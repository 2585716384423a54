//! Uniform JSON response envelope shared by every endpoint

pub mod builder;
pub mod pagination;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::errors::ErrorCode;

pub use builder::{
    normalize_errors, ApiResponse, Clock, Data, EnvelopeBuilder, RequestIdGenerator, SystemClock,
    UuidRequestIds,
};
pub use pagination::{paginate, Page, Pagination, PaginationLinks};

/// Wire-level response body.
///
/// A success envelope never carries `error_code` or `errors`; a failure
/// envelope never carries `data` or `pagination`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Envelope {
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
    /// ISO-8601 UTC, microsecond precision
    pub timestamp: String,
    /// Echo of the inbound `X-Request-ID`, or a generated `req_` id
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    /// Error code for programmatic handling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub meta: Option<Map<String, Value>>,
    /// Caller location, non-production failures only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DebugInfo {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub trace_id: String,
}
