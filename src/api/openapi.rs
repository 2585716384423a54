use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::envelope::{DebugInfo, Envelope, Pagination, PaginationLinks};
use crate::errors::ErrorCode;
use crate::models::{CreateOrganization, Organization};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tenant API",
        version = "0.1.0",
        description = "Multi-tenant SaaS backend. Every response, success or failure, uses the same JSON envelope with a stable error_code clients can branch on.",
        contact(
            name = "Tenant API",
        )
    ),
    paths(
        crate::api::handlers::health,
        crate::api::handlers::health_live,
        crate::api::handlers::list_organizations,
        crate::api::handlers::get_organization,
        crate::api::handlers::create_organization,
        crate::api::handlers::delete_organization,
        crate::api::handlers::me,
    ),
    components(
        schemas(
            Envelope,
            Pagination,
            PaginationLinks,
            DebugInfo,
            ErrorCode,
            Organization,
            CreateOrganization,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "organizations", description = "Organization management"),
        (name = "auth", description = "Token holder information"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
