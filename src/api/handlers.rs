use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

use super::middleware::RateLimiter;
use crate::auth::{Claims, TokenVerifier, ADMIN_ROLE};
use crate::config::Config;
use crate::envelope::{ApiResponse, Envelope, EnvelopeBuilder};
use crate::errors::{ApiFailure, Classifier, RequestContext};
use crate::metrics::ORGANIZATIONS_TOTAL;
use crate::models::{CreateOrganization, Organization};
use crate::store::OrganizationStore;

lazy_static::lazy_static! {
    static ref START_TIME: Instant = Instant::now();
}

const DEFAULT_PER_PAGE: u64 = 20;
const MAX_PER_PAGE: u64 = 100;

pub type AppState = Arc<AppStateInner>;

pub type ApiResult = Result<ApiResponse, ApiFailure>;

pub struct AppStateInner {
    pub envelopes: EnvelopeBuilder,
    pub classifier: Classifier,
    pub organizations: OrganizationStore,
    pub tokens: TokenVerifier,
    pub rate_limiter: RateLimiter,
    pub max_logged_body_bytes: usize,
    pub instance_id: String,
}

impl AppStateInner {
    pub fn from_config(config: &Config) -> Self {
        let environment = config.app.environment.clone();
        Self {
            envelopes: EnvelopeBuilder::new(environment.clone(), config.app.api_version.clone()),
            classifier: Classifier::new(environment),
            organizations: OrganizationStore::new(),
            tokens: TokenVerifier::new(&config.auth),
            rate_limiter: RateLimiter::new(
                config.rate_limit.requests_per_second,
                config.rate_limit.burst,
            ),
            max_logged_body_bytes: config.app.max_logged_body_bytes,
            instance_id: config.server.instance_id.clone(),
        }
    }
}

/// Listing query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListParams {
    /// Page number (starts at 1)
    pub page: Option<u64>,
    /// Results per page (default: 20, max: 100)
    pub per_page: Option<u64>,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = Envelope)
    )
)]
pub async fn health(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> ApiResponse {
    let data = json!({
        "status": "healthy",
        "service": "tenant-api",
        "version": env!("CARGO_PKG_VERSION"),
        "instance_id": state.instance_id,
        "uptime_seconds": START_TIME.elapsed().as_secs(),
    });
    state.envelopes.ok(&ctx, "Service is healthy", Some(data.into()))
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Process is alive", body = Envelope)
    )
)]
pub async fn health_live(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> ApiResponse {
    let data = json!({ "status": "alive", "instance_id": state.instance_id });
    state.envelopes.ok(&ctx, "Service is alive", Some(data.into()))
}

/// List organizations
#[utoipa::path(
    get,
    path = "/api/organizations",
    tag = "organizations",
    params(ListParams),
    responses(
        (status = 200, description = "One page of organizations", body = Envelope),
        (status = 422, description = "Invalid query parameters", body = Envelope)
    )
)]
pub async fn list_organizations(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = params?;
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);

    let listing = state
        .organizations
        .list(page, per_page)
        .await
        .with_path(ctx.path.clone())
        .into_json()?;

    info!("Listed {} organizations (page {})", listing.items().len(), page);
    Ok(state
        .envelopes
        .ok(&ctx, "Organizations retrieved successfully", Some(listing.into())))
}

/// Get one organization
#[utoipa::path(
    get,
    path = "/api/organizations/{id}",
    tag = "organizations",
    params(
        ("id" = Uuid, Path, description = "Organization UUID")
    ),
    responses(
        (status = 200, description = "Organization found", body = Envelope),
        (status = 404, description = "Organization not found", body = Envelope)
    )
)]
pub async fn get_organization(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult {
    let Path(id) = id?;
    let organization = state
        .organizations
        .get(id)
        .await
        .ok_or_else(|| ApiFailure::not_found("Organization", id))?;

    Ok(state.envelopes.ok(
        &ctx,
        "Organization retrieved successfully",
        Some(serde_json::to_value(organization)?.into()),
    ))
}

/// Create an organization
#[utoipa::path(
    post,
    path = "/api/organizations",
    tag = "organizations",
    request_body = CreateOrganization,
    responses(
        (status = 201, description = "Organization created", body = Envelope),
        (status = 409, description = "Name already taken", body = Envelope),
        (status = 422, description = "Validation failed", body = Envelope)
    )
)]
pub async fn create_organization(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<CreateOrganization>, JsonRejection>,
) -> ApiResult {
    let Json(payload) = payload?;
    let organization: Organization = state.organizations.create(payload.validate()?).await?;
    ORGANIZATIONS_TOTAL.set(state.organizations.len().await as i64);

    Ok(state.envelopes.success(
        &ctx,
        "Organization created successfully",
        Some(serde_json::to_value(organization)?.into()),
        StatusCode::CREATED,
        None,
    ))
}

/// Delete an organization (admin only)
#[utoipa::path(
    delete,
    path = "/api/organizations/{id}",
    tag = "organizations",
    params(
        ("id" = Uuid, Path, description = "Organization UUID")
    ),
    responses(
        (status = 200, description = "Organization deleted", body = Envelope),
        (status = 401, description = "Missing, expired or invalid token", body = Envelope),
        (status = 403, description = "Caller is not an admin", body = Envelope),
        (status = 404, description = "Organization not found", body = Envelope)
    ),
    security(("bearer" = []))
)]
pub async fn delete_organization(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult {
    if !claims.has_role(ADMIN_ROLE) {
        return Err(ApiFailure::forbidden());
    }

    let Path(id) = id?;
    state
        .organizations
        .delete(id)
        .await
        .ok_or_else(|| ApiFailure::not_found("Organization", id))?;
    ORGANIZATIONS_TOTAL.set(state.organizations.len().await as i64);

    info!(id = %id, by = %claims.sub, "Organization deleted");
    Ok(state
        .envelopes
        .ok(&ctx, "Organization deleted successfully", None))
}

/// Current token holder
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "auth",
    responses(
        (status = 200, description = "Authenticated user", body = Envelope),
        (status = 401, description = "Missing, expired or invalid token", body = Envelope)
    ),
    security(("bearer" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(claims): Extension<Claims>,
) -> ApiResponse {
    let data = json!({
        "id": claims.sub,
        "roles": claims.roles,
        "expires_at": claims.exp,
    });
    state
        .envelopes
        .ok(&ctx, "User retrieved successfully", Some(data.into()))
}

/// Fallback for unknown routes
pub async fn route_not_found() -> ApiFailure {
    ApiFailure::route_not_found()
}
