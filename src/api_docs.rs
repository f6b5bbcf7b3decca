use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::auth::login,
        api::products::list_products,
        api::products::create_product,
        api::products::get_product,
        api::assignments::list_assignments,
        api::assignments::create_assignment,
        api::assignments::return_assignment,
        api::stickers::generate_stickers,
        api::movements::list_movements,
        api::reports::dashboard,
    ),
    tags(
        (name = "assetdesk", description = "IT asset inventory API")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_core_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/api/health", "/api/products", "/api/assignments/{id}/return"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
