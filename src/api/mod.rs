pub mod assignments;
pub mod auth;
pub mod catalog;
pub mod error;
pub mod health;
pub mod movements;
pub mod product_types;
pub mod products;
pub mod reports;
pub mod stickers;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

use crate::infrastructure::{
    AppState, SeaOrmBrandRepository, SeaOrmCategoryRepository, SeaOrmDepartmentRepository,
    SeaOrmEmployeeRepository, SeaOrmLocationRepository, SeaOrmSupplierRepository,
};

/// Mount the six catalog route groups on the generic handlers
macro_rules! catalog_routes {
    ($router:expr, $($path:literal => $repo:ty),* $(,)?) => {
        $router
        $(
            .route($path, get(catalog::list::<$repo>).post(catalog::create::<$repo>))
            .route(
                concat!($path, "/:id"),
                get(catalog::get::<$repo>)
                    .put(catalog::update::<$repo>)
                    .delete(catalog::delete::<$repo>),
            )
            .route(concat!($path, "/:id/toggle"), post(catalog::toggle::<$repo>))
        )*
    };
}

pub fn api_router(state: AppState) -> Router {
    // Multipart overhead on top of the configured image ceiling
    let upload_limit = (state.config.max_upload_mb as usize + 1) * 1024 * 1024;

    let router = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/register", post(auth::register))
        .route("/auth/me", get(auth::me))
        // Reports
        .route("/dashboard", get(reports::dashboard))
        .route("/reports/inventory", get(reports::inventory_report))
        .route("/export", get(reports::export))
        .route("/backup", get(reports::backup))
        // Products
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/products/:id/image",
            post(products::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/products/:id/custom-data",
            get(product_types::get_custom_data).put(product_types::save_custom_data),
        )
        .route("/categories/:id/fields", get(products::category_fields))
        // Stickers
        .route(
            "/products/:id/stickers",
            get(stickers::list_stickers).post(stickers::generate_stickers),
        )
        .route("/stickers/:id/print", get(stickers::print_sticker))
        .route("/stickers/:id/download", get(stickers::download_sticker))
        .route("/stickers/:id/printed", post(stickers::mark_printed))
        .route("/stickers/:id", delete(stickers::delete_sticker))
        // Assignments
        .route(
            "/assignments",
            get(assignments::list_assignments).post(assignments::create_assignment),
        )
        .route("/assignments/overdue", get(assignments::overdue_loans))
        .route("/assignments/reminders", post(assignments::send_reminder))
        .route("/assignments/:id", get(assignments::get_assignment))
        .route("/assignments/:id/return", post(assignments::return_assignment))
        .route("/assignments/:id/confirm", post(assignments::confirm_assignment))
        .route("/assignments/:id/report", get(assignments::assignment_report))
        .route(
            "/departments/:id/employees",
            get(assignments::department_employees),
        )
        // Movements
        .route("/movements", get(movements::list_movements))
        // Product types
        .route(
            "/product-types",
            get(product_types::list_types).post(product_types::create_type),
        )
        .route("/product-types/detect", get(product_types::detect_type))
        .route(
            "/product-types/:id",
            get(product_types::get_type)
                .put(product_types::update_type)
                .delete(product_types::delete_type),
        )
        .route("/product-types/:id/next-serial", post(product_types::next_serial));

    // Master data
    let router = catalog_routes!(router,
        "/categories" => SeaOrmCategoryRepository,
        "/brands" => SeaOrmBrandRepository,
        "/suppliers" => SeaOrmSupplierRepository,
        "/departments" => SeaOrmDepartmentRepository,
        "/employees" => SeaOrmEmployeeRepository,
        "/locations" => SeaOrmLocationRepository,
    );

    router.with_state(state)
}
