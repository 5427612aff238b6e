use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockroom API",
        version = "0.1.0",
        description = r#"
# Stockroom inventory API

Tracks a part catalogue, the stock kept at each location, and bills of
materials with a scan-driven checklist for kitting them.

## Authentication

Reads are open. Every route that changes data requires a bearer token:

```
Authorization: Bearer <jwt>
```

Tokens are issued by operators with `stockroom-admin token <username>`.

## Responses

Successful responses are wrapped as
`{"success": true, "data": ..., "meta": {"request_id": ..., "timestamp": ...}}`.
Errors carry `error`, `message`, and `field` when one input is at fault.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "catalogue", description = "Brands and catalogue entries"),
        (name = "locations", description = "Storage locations"),
        (name = "stock", description = "Stock ledger and checked-out history"),
        (name = "boms", description = "Bills of materials and their line items"),
        (name = "checklist", description = "BOM kitting checklist"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        // Catalogue
        crate::handlers::catalogue::list_brands,
        crate::handlers::catalogue::create_brand,
        crate::handlers::catalogue::get_brand,
        crate::handlers::catalogue::list_entries,
        crate::handlers::catalogue::create_entry,
        crate::handlers::catalogue::get_entry,
        crate::handlers::catalogue::update_entry,
        crate::handlers::catalogue::delete_entry,

        // Locations
        crate::handlers::locations::list_locations,
        crate::handlers::locations::create_location,
        crate::handlers::locations::get_location,
        crate::handlers::locations::rename_location,

        // Stock
        crate::handlers::stock::list_stock,
        crate::handlers::stock::add_stock,
        crate::handlers::stock::get_stock,
        crate::handlers::stock::delete_stock,
        crate::handlers::stock::checkout_stock,
        crate::handlers::stock::list_checked_out,

        // BOMs and checklist
        crate::handlers::bom::list_boms,
        crate::handlers::bom::create_bom,
        crate::handlers::bom::get_bom,
        crate::handlers::bom::rename_bom,
        crate::handlers::bom::delete_bom,
        crate::handlers::bom::list_bom_items,
        crate::handlers::bom::edit_bom_items,
        crate::handlers::bom::get_checklist,
        crate::handlers::bom::generate_checklist,
        crate::handlers::bom::scan_part,

        crate::health::health_check,
    ),
    components(
        schemas(
            // Common types
            crate::ResponseMeta,
            crate::handlers::common::PaginationMeta,

            // Stored records
            crate::entities::brand::Model,
            crate::entities::catalogue::Model,
            crate::entities::location::Model,
            crate::entities::stock::Model,
            crate::entities::checked_out_stock::Model,
            crate::entities::bom::Model,
            crate::entities::bom_item::Model,
            crate::entities::bom_checklist::Model,

            // Request and view types
            crate::services::catalogue::NewBrand,
            crate::services::catalogue::NewCatalogueEntry,
            crate::services::catalogue::CatalogueEntryFields,
            crate::services::catalogue::BrandDetail,
            crate::services::catalogue::CatalogueEntryDetail,
            crate::services::locations::LocationName,
            crate::services::locations::LocationDetail,
            crate::services::stock::AddStock,
            crate::services::stock::CheckoutStock,
            crate::services::stock::CheckoutOutcome,
            crate::services::bom::BomName,
            crate::services::bom::BomItemEdit,
            crate::services::bom::BomItemsBatch,
            crate::services::bom::BomDetail,
            crate::services::checklist::ScanPart,
            crate::services::checklist::ChecklistLine,
            crate::services::checklist::ChecklistView,
            crate::health::HealthInfo,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Registers the `bearer_auth` scheme the mutating routes refer to.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
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

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let openapi = ApiDocV1::openapi();
        assert_eq!(openapi.info.title, "Stockroom API");

        let paths = &openapi.paths.paths;
        for path in [
            "/api/v1/brands",
            "/api/v1/catalogue/{part_number}",
            "/api/v1/stock/{id}/checkout",
            "/api/v1/checked-out",
            "/api/v1/boms/{id}/items",
            "/api/v1/boms/{id}/checklist/scan",
            "/health",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let openapi = ApiDocV1::openapi();
        let components = openapi.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
