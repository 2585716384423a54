use axum::{
    middleware,
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    create_organization, delete_organization, get_organization, health, health_live,
    list_organizations, me, route_not_found, AppState,
};
use super::middleware::{logging_middleware, normalize_failures, rate_limit, require_bearer};
use super::openapi::ApiDoc;
use crate::metrics;

pub fn create_router(state: AppState) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let bearer = middleware::from_fn_with_state(state.clone(), require_bearer);

    Router::new()
        // Health check
        .route("/health", get(health))
        .route("/health/live", get(health_live))
        // Organizations
        .route(
            "/api/organizations",
            get(list_organizations).post(create_organization),
        )
        .route(
            "/api/organizations/:id",
            get(get_organization).merge(delete(delete_organization).route_layer(bearer.clone())),
        )
        // Authenticated caller
        .route("/api/me", get(me).route_layer(bearer))
        // Metrics endpoint (Prometheus)
        .route("/metrics", get(metrics::metrics_handler))
        .fallback(route_not_found)
        // Add middleware (innermost first: rate limit, failures, logging, metrics, cors, trace)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::from_fn_with_state(state.clone(), normalize_failures))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics::middleware::track_metrics))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // OpenAPI documentation
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add shared state
        .with_state(state)
}
