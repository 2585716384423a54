use axum::http::{request::Parts, HeaderMap};
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Replacement written over sensitive values before a body is logged
pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_KEYS: [&str; 9] = [
    "password",
    "password_confirmation",
    "token",
    "api_key",
    "secret",
    "private_key",
    "card_number",
    "cvv",
    "ssn",
];

/// Read-only snapshot of the in-flight request, used when classifying and
/// logging a failure and when choosing the envelope's `request_id`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestContext {
    pub method: String,
    pub url: String,
    pub path: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: Option<String>,
    /// Inbound `X-Request-ID`, if the client sent one
    pub request_id: Option<String>,
    /// Sanitized JSON body. Only captured outside production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        let ip = parts
            .extensions
            .get::<axum::extract::ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip().to_string())
            .or_else(|| forwarded_for(&parts.headers));

        Self {
            method: parts.method.to_string(),
            url: parts.uri.to_string(),
            path: parts.uri.path().to_string(),
            ip,
            user_agent: header_value(&parts.headers, "user-agent"),
            user_id: None,
            request_id: header_value(&parts.headers, REQUEST_ID_HEADER),
            body: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Attach a request body, redacting sensitive keys first
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(sanitize(body));
        self
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
}

pub(crate) fn is_sensitive(key: &str) -> bool {
    SENSITIVE_KEYS
        .iter()
        .any(|sensitive| sensitive.eq_ignore_ascii_case(key))
}

/// Replace the values of sensitive keys at any depth
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    if is_sensitive(&key) {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, sanitize(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        other => other,
    }
}
