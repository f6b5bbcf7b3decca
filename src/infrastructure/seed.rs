use crate::auth::hash_password;
use crate::domain::{
    BrandInput, CatalogRepository, CategoryInput, DepartmentInput, DomainError, EmployeeInput,
    LocationInput,
};
use crate::infrastructure::{
    SeaOrmBrandRepository, SeaOrmCategoryRepository, SeaOrmDepartmentRepository,
    SeaOrmEmployeeRepository, SeaOrmLocationRepository,
};
use crate::models::{category, user};
use crate::services::Actor;
use crate::services::product_service::{self, CreateProductInput};
use crate::utils::dates::today;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

/// Demo accounts plus a small catalog. Skips the catalog when one already exists.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DomainError> {
    // 1. Users
    for (username, password, role) in [("admin", "admin1234", "admin"), ("user", "user1234", "user")] {
        let password_hash = hash_password(password).map_err(DomainError::Internal)?;
        let now = chrono::Utc::now().to_rfc3339();
        let account = user::ActiveModel {
            username: Set(username.to_owned()),
            password_hash: Set(password_hash),
            role: Set(role.to_owned()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };
        user::Entity::insert(account)
            .on_conflict(
                OnConflict::column(user::Column::Username)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    if category::Entity::find().count(db).await? > 0 {
        tracing::info!("Catalog already present, skipping demo catalog");
        return Ok(());
    }

    let admin = user::Entity::find()
        .filter(user::Column::Username.eq("admin"))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("User"))?;
    let actor = Actor {
        user_id: admin.id,
        username: admin.username.clone(),
        is_admin: true,
    };

    // 2. Master data
    let categories = SeaOrmCategoryRepository::new(db.clone());
    let laptops = categories
        .create(
            CategoryInput {
                name: "Laptops".to_owned(),
                code: "LAPTOP".to_owned(),
                description: Some("Portable computers".to_owned()),
                specific_fields: serde_json::from_value(serde_json::json!({
                    "ram_gb": { "kind": "number", "label": "RAM (GB)", "required": true },
                    "processor": { "kind": "text", "label": "Processor" }
                }))?,
            },
            admin.id,
        )
        .await?;
    let monitors = categories
        .create(
            CategoryInput {
                name: "Monitors".to_owned(),
                code: "MONITOR".to_owned(),
                description: None,
                specific_fields: Default::default(),
            },
            admin.id,
        )
        .await?;

    let brands = SeaOrmBrandRepository::new(db.clone());
    let dell = brands
        .create(BrandInput { name: "Dell".to_owned() }, admin.id)
        .await?;
    let lenovo = brands
        .create(BrandInput { name: "Lenovo".to_owned() }, admin.id)
        .await?;

    let it = SeaOrmDepartmentRepository::new(db.clone())
        .create(
            DepartmentInput {
                name: "IT".to_owned(),
                code: "IT".to_owned(),
                description: Some("Systems and support".to_owned()),
                manager_user_id: Some(admin.id),
            },
            admin.id,
        )
        .await?;

    SeaOrmEmployeeRepository::new(db.clone())
        .create(
            EmployeeInput {
                name: "Ana García".to_owned(),
                national_id: "12345678Z".to_owned(),
                email: "ana.garcia@example.com".to_owned(),
                phone: None,
                department_id: it.id,
                position: Some("Technician".to_owned()),
                hired_on: None,
                left_on: None,
            },
            admin.id,
        )
        .await?;

    let office = SeaOrmLocationRepository::new(db.clone())
        .create(
            LocationInput {
                name: "Main office".to_owned(),
                building: Some("A".to_owned()),
                floor: Some("2".to_owned()),
                room: None,
                description: None,
            },
            admin.id,
        )
        .await?;

    // 3. Products
    let purchased_on = today().format("%Y-%m-%d").to_string();
    let demo_products = [
        (laptops.id, dell.id, "Latitude 5440", 1150.0, serde_json::json!({ "ram_gb": 16, "processor": "i7" })),
        (laptops.id, lenovo.id, "ThinkPad T14", 1290.0, serde_json::json!({ "ram_gb": 32 })),
        (monitors.id, dell.id, "P2422H", 210.0, serde_json::json!({})),
    ];
    for (category_id, brand_id, model, price, specs) in demo_products {
        product_service::create_product(
            db,
            CreateProductInput {
                category_id,
                brand_id,
                model: model.to_owned(),
                serial_number: None,
                barcode: None,
                condition: None,
                supplier_id: None,
                purchased_on: purchased_on.clone(),
                purchase_price: price,
                invoice_number: None,
                warranty_ends_on: None,
                location_id: Some(office.id),
                specifications: serde_json::from_value(specs)?,
                notes: None,
            },
            &actor,
        )
        .await?;
    }

    tracing::info!("Demo data seeded");
    Ok(())
}
