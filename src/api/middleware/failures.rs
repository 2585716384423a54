use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::api::handlers::AppState;
use crate::errors::{ApiFailure, RequestContext};
use crate::metrics::registry::API_FAILURES_TOTAL;

/// A failure waiting to be classified by [`normalize_failures`]
#[derive(Clone)]
pub struct FailureSlot {
    pub failure: Arc<ApiFailure>,
    /// Filled in by auth middleware once the caller is known
    pub user_id: Option<String>,
}

/// Handlers return failures rather than error responses. The response
/// produced here is a placeholder that `normalize_failures` replaces with
/// the classified envelope.
impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(FailureSlot {
            failure: Arc::new(self),
            user_id: None,
        });
        response
    }
}

/// Capture the [`RequestContext`] for downstream handlers and turn every
/// failed response into a classified envelope.
///
/// Outside production, JSON bodies up to the configured size are buffered
/// so failure logs can include a sanitized copy.
pub async fn normalize_failures(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let mut ctx = RequestContext::from_parts(&parts);

    let body = if should_capture_body(&state, &parts.headers) {
        match axum::body::to_bytes(body, state.max_logged_body_bytes).await {
            Ok(bytes) => {
                if let Ok(json) = serde_json::from_slice(&bytes) {
                    ctx = ctx.with_body(json);
                }
                Body::from(bytes)
            }
            Err(e) => {
                debug!("Failed to buffer request body: {}", e);
                return respond(&state, &ApiFailure::http(400), &ctx);
            }
        }
    } else {
        body
    };

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(ctx.clone());

    let response = next.run(request).await;

    if let Some(slot) = response.extensions().get::<FailureSlot>() {
        if let Some(user_id) = &slot.user_id {
            ctx = ctx.with_user_id(user_id.clone());
        }
        return respond(&state, &slot.failure, &ctx);
    }

    // Error responses produced outside our handlers (e.g. 405 from the
    // router) are still sent as envelopes.
    let status = response.status();
    if (status.is_client_error() || status.is_server_error()) && !is_json(&response) {
        return respond(&state, &ApiFailure::http(status.as_u16()), &ctx);
    }

    response
}

fn respond(state: &AppState, failure: &ApiFailure, ctx: &RequestContext) -> Response {
    let response = state.classifier.respond(&state.envelopes, failure, ctx);
    if let Some(code) = response.envelope.error_code {
        API_FAILURES_TOTAL
            .with_label_values(&[code.as_str(), response.status.as_str()])
            .inc();
    }
    response.into_response()
}

fn should_capture_body(state: &AppState, headers: &axum::http::HeaderMap) -> bool {
    if state.envelopes.environment().is_production() {
        return false;
    }
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    let fits = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .is_some_and(|len| len <= state.max_logged_body_bytes);
    is_json && fits
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}
