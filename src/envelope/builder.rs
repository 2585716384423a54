use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::{DebugInfo, Envelope, Page};
use crate::config::Environment;
use crate::errors::context::{RequestContext, REQUEST_ID_HEADER};
use crate::errors::{ErrorCode, SourceLocation};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Time source for envelope timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of opaque request and trace identifiers
pub trait RequestIdGenerator: Send + Sync {
    fn request_id(&self) -> String;
    fn trace_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestIds;

impl RequestIdGenerator for UuidRequestIds {
    fn request_id(&self) -> String {
        format!("req_{}", Uuid::new_v4().simple())
    }

    fn trace_id(&self) -> String {
        format!("trace_{}", Uuid::new_v4().simple())
    }
}

/// Success payload: a plain value or one page of a collection
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Value(Value),
    Paginated(Page<Value>),
}

impl From<Value> for Data {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Page<Value>> for Data {
    fn from(page: Page<Value>) -> Self {
        Self::Paginated(page)
    }
}

/// Coerce caller-supplied errors into the wire shape.
///
/// Strings become one-element arrays, objects and arrays pass through,
/// null means no errors and other scalars are wrapped as `{details: v}`.
pub fn normalize_errors(errors: Value) -> Option<Value> {
    match errors {
        Value::Null => None,
        Value::String(message) => Some(json!([message])),
        value @ (Value::Object(_) | Value::Array(_)) => Some(value),
        other => Some(json!({ "details": other })),
    }
}

/// An envelope paired with the HTTP status it is sent with
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub envelope: Envelope,
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let request_id = HeaderValue::from_str(&self.envelope.request_id).ok();
        let retry_after = self
            .envelope
            .meta
            .as_ref()
            .and_then(|meta| meta.get("retry_after"))
            .and_then(Value::as_u64);

        let mut response = (self.status, Json(self.envelope)).into_response();
        if let Some(request_id) = request_id {
            response.headers_mut().insert(REQUEST_ID_HEADER, request_id);
        }
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

/// Builds every envelope the service sends.
///
/// Output depends only on the arguments, the environment, the clock and
/// the id generator.
#[derive(Clone)]
pub struct EnvelopeBuilder {
    environment: Environment,
    api_version: String,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn RequestIdGenerator>,
}

impl EnvelopeBuilder {
    pub fn new(environment: Environment, api_version: impl Into<String>) -> Self {
        Self {
            environment,
            api_version: api_version.into(),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidRequestIds),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_request_ids(mut self, ids: Arc<dyn RequestIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// 200 success with no extra metadata
    pub fn ok(
        &self,
        ctx: &RequestContext,
        message: impl Into<String>,
        data: Option<Data>,
    ) -> ApiResponse {
        self.success(ctx, message, data, StatusCode::OK, None)
    }

    pub fn success(
        &self,
        ctx: &RequestContext,
        message: impl Into<String>,
        data: Option<Data>,
        status: StatusCode,
        meta: Option<Map<String, Value>>,
    ) -> ApiResponse {
        let (data, pagination) = match data {
            Some(Data::Value(value)) => (Some(value), None),
            Some(Data::Paginated(page)) => {
                let pagination = page.pagination();
                (Some(Value::Array(page.into_items())), Some(pagination))
            }
            None => (None, None),
        };

        let mut envelope = self.base(ctx, true, message.into(), meta);
        envelope.data = data;
        envelope.pagination = pagination;

        ApiResponse { status, envelope }
    }

    /// Failure envelope with default code and no metadata
    #[track_caller]
    pub fn error(
        &self,
        ctx: &RequestContext,
        message: impl Into<String>,
        errors: Option<Value>,
        status: StatusCode,
    ) -> ApiResponse {
        self.failure(ctx, message, errors, status, None, None)
    }

    /// Failure envelope. The debug block (non-production) names the caller
    /// of this method.
    #[track_caller]
    pub fn failure(
        &self,
        ctx: &RequestContext,
        message: impl Into<String>,
        errors: Option<Value>,
        status: StatusCode,
        error_code: Option<ErrorCode>,
        meta: Option<Map<String, Value>>,
    ) -> ApiResponse {
        self.failure_at(
            SourceLocation::caller(),
            ctx,
            message,
            errors,
            status,
            error_code,
            meta,
        )
    }

    /// Failure envelope whose debug block names `origin`
    #[allow(clippy::too_many_arguments)]
    pub fn failure_at(
        &self,
        origin: SourceLocation,
        ctx: &RequestContext,
        message: impl Into<String>,
        errors: Option<Value>,
        status: StatusCode,
        error_code: Option<ErrorCode>,
        meta: Option<Map<String, Value>>,
    ) -> ApiResponse {
        let mut envelope = self.base(ctx, false, message.into(), meta);
        let error_code = error_code.unwrap_or_else(|| ErrorCode::for_status(status.as_u16()));
        envelope.error_code = Some(error_code);
        envelope.errors = errors.and_then(normalize_errors);

        if !self.environment.is_production() {
            envelope.debug = Some(DebugInfo {
                file: origin.file,
                line: origin.line,
                column: origin.column,
                trace_id: self.ids.trace_id(),
            });
        }

        ApiResponse { status, envelope }
    }

    fn base(
        &self,
        ctx: &RequestContext,
        success: bool,
        message: String,
        meta: Option<Map<String, Value>>,
    ) -> Envelope {
        let mut merged = Map::new();
        merged.insert("api_version".to_string(), json!(self.api_version));
        merged.insert("environment".to_string(), json!(self.environment.name()));
        if let Some(meta) = meta {
            merged.extend(meta);
        }

        Envelope {
            success,
            message,
            timestamp: self.clock.now().format(TIMESTAMP_FORMAT).to_string(),
            request_id: ctx
                .request_id
                .clone()
                .unwrap_or_else(|| self.ids.request_id()),
            data: None,
            pagination: None,
            error_code: None,
            errors: None,
            meta: Some(merged),
            debug: None,
        }
    }
}
