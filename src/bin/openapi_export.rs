// Prints the OpenAPI schema served at /api-docs/openapi.json
// Usage: cargo run --bin openapi_export > openapi.json

use tenant_api::api::openapi::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}
