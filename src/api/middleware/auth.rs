use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::failures::FailureSlot;
use crate::api::handlers::AppState;

/// Require a valid bearer token. Verified [`Claims`](crate::auth::Claims)
/// are stored in request extensions for handlers.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = match state.tokens.verify_headers(request.headers()) {
        Ok(claims) => claims,
        Err(failure) => return failure.into_response(),
    };

    let user_id = claims.sub.clone();
    request.extensions_mut().insert(claims);

    let mut response = next.run(request).await;
    if let Some(slot) = response.extensions_mut().get_mut::<FailureSlot>() {
        slot.user_id.get_or_insert(user_id);
    }
    response
}
