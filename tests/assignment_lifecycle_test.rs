use assetdesk::db;
use assetdesk::domain::{
    BrandInput, CatalogRepository, CategoryInput, DepartmentInput, DomainError, EmployeeInput,
};
use assetdesk::infrastructure::{
    SeaOrmBrandRepository, SeaOrmCategoryRepository, SeaOrmDepartmentRepository,
    SeaOrmEmployeeRepository,
};
use assetdesk::models::{AssetState, MovementKind, assignment, product, sticker, stock_movement, user};
use assetdesk::services::assignment_service::{self, CreateAssignmentInput, ReturnInput};
use assetdesk::services::product_service::{self, CreateProductInput};
use assetdesk::services::{Actor, Mailer, OutgoingMail, sticker_service};
use async_trait::async_trait;
use chrono::{Duration, Local};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Mutex;

struct Fixture {
    db: DatabaseConnection,
    actor: Actor,
    department_id: i32,
    employee_id: i32,
    other_department_id: i32,
    category_id: i32,
    brand_id: i32,
}

async fn setup() -> Fixture {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    setup_on(db).await
}

async fn setup_on(db: DatabaseConnection) -> Fixture {
    let now = chrono::Utc::now().to_rfc3339();
    let admin_id = user::Entity::insert(user::ActiveModel {
        username: Set("admin".to_string()),
        password_hash: Set("unused".to_string()),
        role: Set("admin".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    })
    .exec(&db)
    .await
    .expect("Failed to create admin")
    .last_insert_id;

    let category = SeaOrmCategoryRepository::new(db.clone())
        .create(
            CategoryInput {
                name: "Phones".to_string(),
                code: "PHONE".to_string(),
                description: None,
                specific_fields: Default::default(),
            },
            admin_id,
        )
        .await
        .unwrap();
    let brand = SeaOrmBrandRepository::new(db.clone())
        .create(BrandInput { name: "Fairphone".to_string() }, admin_id)
        .await
        .unwrap();

    let departments = SeaOrmDepartmentRepository::new(db.clone());
    let sales = departments
        .create(
            DepartmentInput {
                name: "Sales".to_string(),
                code: "SAL".to_string(),
                description: None,
                manager_user_id: None,
            },
            admin_id,
        )
        .await
        .unwrap();
    let legal = departments
        .create(
            DepartmentInput {
                name: "Legal".to_string(),
                code: "LEG".to_string(),
                description: None,
                manager_user_id: None,
            },
            admin_id,
        )
        .await
        .unwrap();

    let employee = SeaOrmEmployeeRepository::new(db.clone())
        .create(
            EmployeeInput {
                name: "Marta Ruiz".to_string(),
                national_id: "11223344B".to_string(),
                email: "marta@example.com".to_string(),
                phone: None,
                department_id: sales.id,
                position: None,
                hired_on: None,
                left_on: None,
            },
            admin_id,
        )
        .await
        .unwrap();

    Fixture {
        db,
        actor: Actor {
            user_id: admin_id,
            username: "admin".to_string(),
            is_admin: true,
        },
        department_id: sales.id,
        employee_id: employee.id,
        other_department_id: legal.id,
        category_id: category.id,
        brand_id: brand.id,
    }
}

async fn register_phone(fx: &Fixture, serial: &str) -> product::Model {
    product_service::create_product(
        &fx.db,
        CreateProductInput {
            category_id: fx.category_id,
            brand_id: fx.brand_id,
            model: "Fairphone 5".to_string(),
            serial_number: Some(serial.to_string()),
            barcode: None,
            condition: None,
            supplier_id: None,
            purchased_on: "2024-03-01".to_string(),
            purchase_price: 699.0,
            invoice_number: None,
            warranty_ends_on: None,
            location_id: None,
            specifications: Default::default(),
            notes: None,
        },
        &fx.actor,
    )
    .await
    .expect("Failed to register product")
}

fn day(offset: i64) -> String {
    (Local::now().date_naive() + Duration::days(offset))
        .format("%Y-%m-%d")
        .to_string()
}

fn delivery(fx: &Fixture, product_id: i32, kind: &str) -> CreateAssignmentInput {
    CreateAssignmentInput {
        product_id,
        department_id: fx.department_id,
        employee_id: Some(fx.employee_id),
        kind: kind.to_string(),
        delivered_on: day(0),
        expected_return_on: None,
        delivery_notes: None,
        delivery_document: None,
    }
}

fn return_with(condition: &str) -> ReturnInput {
    ReturnInput {
        returned_on: day(0),
        condition: condition.to_string(),
        reason: None,
        notes: None,
        document: None,
    }
}

async fn state_of(db: &DatabaseConnection, id: i32) -> AssetState {
    product::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .state
}

#[tokio::test]
async fn test_delivery_moves_asset_out_of_stock() {
    let fx = setup().await;
    let phone = register_phone(&fx, "FP-001").await;

    let assignment = assignment_service::create_assignment(&fx.db, delivery(&fx, phone.id, "ENTREGA"), &fx.actor)
        .await
        .unwrap();

    assert!(assignment.is_pending());
    assert_eq!(assignment.condition_on_delivery, "NUEVO");
    assert_eq!(state_of(&fx.db, phone.id).await, AssetState::Delivered);
}

#[tokio::test]
async fn test_second_assignment_is_refused() {
    let fx = setup().await;
    let phone = register_phone(&fx, "FP-002").await;
    assignment_service::create_assignment(&fx.db, delivery(&fx, phone.id, "ENTREGA"), &fx.actor)
        .await
        .unwrap();

    let err = assignment_service::create_assignment(&fx.db, delivery(&fx, phone.id, "PRESTAMO"), &fx.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BusinessRule(_)), "{err:?}");
}

#[tokio::test]
async fn test_employee_must_belong_to_department() {
    let fx = setup().await;
    let phone = register_phone(&fx, "FP-003").await;

    let mut input = delivery(&fx, phone.id, "ENTREGA");
    input.department_id = fx.other_department_id;
    let err = assignment_service::create_assignment(&fx.db, input, &fx.actor)
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::BusinessRule(_)));
    assert_eq!(state_of(&fx.db, phone.id).await, AssetState::Available);
}

#[tokio::test]
async fn test_dates_are_validated() {
    let fx = setup().await;
    let phone = register_phone(&fx, "FP-004").await;

    let mut future = delivery(&fx, phone.id, "ENTREGA");
    future.delivered_on = day(1);
    let err = assignment_service::create_assignment(&fx.db, future, &fx.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let mut backwards = delivery(&fx, phone.id, "PRESTAMO");
    backwards.expected_return_on = Some(day(-3));
    let err = assignment_service::create_assignment(&fx.db, backwards, &fx.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = assignment_service::create_assignment(&fx.db, delivery(&fx, phone.id, "REGALO"), &fx.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_faulty_return_goes_to_workshop() {
    let fx = setup().await;
    let phone = register_phone(&fx, "FP-005").await;
    let assignment = assignment_service::create_assignment(&fx.db, delivery(&fx, phone.id, "ENTREGA"), &fx.actor)
        .await
        .unwrap();

    let returned = assignment_service::return_assignment(&fx.db, assignment.id, return_with("AVERIADO"), &fx.actor)
        .await
        .unwrap();
    assert!(!returned.is_pending());
    assert_eq!(state_of(&fx.db, phone.id).await, AssetState::Faulty);

    let last = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(phone.id))
        .order_by_desc(stock_movement::Column::Id)
        .one(&fx.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last.kind, MovementKind::Repair);
    assert_eq!(last.origin.as_deref(), Some("Sales"));
    assert_eq!(last.destination.as_deref(), Some("Taller"));
}

#[tokio::test]
async fn test_unrecognised_condition_returns_to_stock() {
    let fx = setup().await;
    let phone = register_phone(&fx, "FP-006").await;
    let assignment = assignment_service::create_assignment(&fx.db, delivery(&fx, phone.id, "ENTREGA"), &fx.actor)
        .await
        .unwrap();

    assignment_service::return_assignment(&fx.db, assignment.id, return_with("ROTO"), &fx.actor)
        .await
        .unwrap();
    assert_eq!(state_of(&fx.db, phone.id).await, AssetState::Available);

    // The asset can go out again
    assignment_service::create_assignment(&fx.db, delivery(&fx, phone.id, "ENTREGA"), &fx.actor)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_double_return_is_refused() {
    let fx = setup().await;
    let phone = register_phone(&fx, "FP-007").await;
    let assignment = assignment_service::create_assignment(&fx.db, delivery(&fx, phone.id, "ENTREGA"), &fx.actor)
        .await
        .unwrap();
    assignment_service::return_assignment(&fx.db, assignment.id, return_with("bueno"), &fx.actor)
        .await
        .unwrap();

    let err = assignment_service::return_assignment(&fx.db, assignment.id, return_with("bueno"), &fx.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BusinessRule(_)));
}

#[tokio::test]
async fn test_confirmation_only_once() {
    let fx = setup().await;
    let phone = register_phone(&fx, "FP-008").await;
    let assignment = assignment_service::create_assignment(&fx.db, delivery(&fx, phone.id, "ENTREGA"), &fx.actor)
        .await
        .unwrap();

    let confirmed = assignment_service::confirm_assignment(&fx.db, assignment.id, &fx.actor)
        .await
        .unwrap();
    assert!(confirmed.confirmed_by_employee);
    assert!(confirmed.confirmed_at.is_some());

    let err = assignment_service::confirm_assignment(&fx.db, assignment.id, &fx.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BusinessRule(_)));
}

#[tokio::test]
async fn test_overdue_loans() {
    let fx = setup().await;
    let phone = register_phone(&fx, "FP-009").await;
    let mut loan = delivery(&fx, phone.id, "PRESTAMO");
    loan.delivered_on = day(-10);
    loan.expected_return_on = Some(day(-2));
    assignment_service::create_assignment(&fx.db, loan, &fx.actor)
        .await
        .unwrap();

    let today = Local::now().date_naive();
    let overdue = assignment_service::overdue_loans(&fx.db, today).await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert!(overdue[0].loan_overdue);
    assert_eq!(overdue[0].employee_name.as_deref(), Some("Marta Ruiz"));

    let earlier = today - Duration::days(5);
    assert!(assignment_service::overdue_loans(&fx.db, earlier).await.unwrap().is_empty());
}

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), DomainError> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

#[tokio::test]
async fn test_reminder_is_sent_to_employee() {
    let fx = setup().await;
    let phone = register_phone(&fx, "FP-010").await;
    let assignment = assignment_service::create_assignment(&fx.db, delivery(&fx, phone.id, "ENTREGA"), &fx.actor)
        .await
        .unwrap();

    let mailer = RecordingMailer::default();
    let mail = assignment_service::send_reminder(&fx.db, &mailer, assignment.id, &fx.actor)
        .await
        .unwrap();

    assert_eq!(mail.to, "marta@example.com");
    assert!(mail.body.contains("FP-010"));
    assert!(mail.body.contains("Please confirm"));
    assert_eq!(mailer.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_report_lists_assignment_fields() {
    let fx = setup().await;
    let phone = register_phone(&fx, "FP-011").await;
    let assignment = assignment_service::create_assignment(&fx.db, delivery(&fx, phone.id, "ENTREGA"), &fx.actor)
        .await
        .unwrap();

    let rows = assignment_service::assignment_report(&fx.db, assignment.id).await.unwrap();
    let employee = rows.iter().find(|(k, _)| k == "Employee").unwrap();
    assert_eq!(employee.1, "Marta Ruiz");

    let csv = assignment_service::report_csv(&rows).unwrap();
    let text = String::from_utf8(csv).unwrap();
    assert!(text.starts_with("Field,Value"));
}

#[tokio::test]
async fn test_retiring_blocked_while_assigned() {
    let fx = setup().await;
    let phone = register_phone(&fx, "FP-012").await;
    let assignment = assignment_service::create_assignment(&fx.db, delivery(&fx, phone.id, "ENTREGA"), &fx.actor)
        .await
        .unwrap();

    let err = product_service::retire_product(&fx.db, phone.id, &fx.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BusinessRule(_)));

    assignment_service::return_assignment(&fx.db, assignment.id, return_with("bueno"), &fx.actor)
        .await
        .unwrap();
    let retired = product_service::retire_product(&fx.db, phone.id, &fx.actor)
        .await
        .unwrap();
    assert!(!retired.active);
}

#[tokio::test]
async fn test_sweep_deactivates_stickers_of_retired_products() {
    let fx = setup().await;
    let media = tempfile::tempdir().unwrap();
    let phone = register_phone(&fx, "FP-013").await;

    let renderer = assetdesk::labels::RasterRenderer;
    let stickers = sticker_service::generate(&fx.db, &renderer, media.path(), phone.id, &[], &fx.actor)
        .await
        .unwrap();
    assert_eq!(stickers.len(), 1);
    let file = media.path().join(stickers[0].image_path.as_deref().unwrap());
    assert!(file.exists());

    assert_eq!(sticker_service::sweep(&fx.db, media.path()).await.unwrap(), 0);

    product_service::retire_product(&fx.db, phone.id, &fx.actor)
        .await
        .unwrap();
    assert_eq!(sticker_service::sweep(&fx.db, media.path()).await.unwrap(), 1);
    assert!(!file.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_assignments_only_one_wins() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("race.db").display());
    let fx = setup_on(db::init_db(&url).await.expect("Failed to init DB")).await;
    let phone = register_phone(&fx, "FP-014").await;

    let (first, second) = tokio::join!(
        assignment_service::create_assignment(&fx.db, delivery(&fx, phone.id, "ENTREGA"), &fx.actor),
        assignment_service::create_assignment(&fx.db, delivery(&fx, phone.id, "ENTREGA"), &fx.actor),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let err = results.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(err, DomainError::BusinessRule(_)), "{err:?}");

    let rows = assignment::Entity::find()
        .filter(assignment::Column::ProductId.eq(phone.id))
        .count(&fx.db)
        .await
        .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(state_of(&fx.db, phone.id).await, AssetState::Delivered);
}

#[tokio::test]
async fn test_return_before_delivery_is_rejected() {
    let fx = setup().await;
    let phone = register_phone(&fx, "FP-015").await;
    let mut input = delivery(&fx, phone.id, "ENTREGA");
    input.delivered_on = day(-2);
    let created = assignment_service::create_assignment(&fx.db, input, &fx.actor)
        .await
        .unwrap();

    let mut early = return_with("BUENO");
    early.returned_on = day(-5);
    let err = assignment_service::return_assignment(&fx.db, created.id, early, &fx.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)), "{err:?}");

    let stored = assignment::Entity::find_by_id(created.id)
        .one(&fx.db)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.returned_at.is_none());
    assert!(stored.is_pending());
    assert_eq!(state_of(&fx.db, phone.id).await, AssetState::Delivered);

    // Same-day return is fine
    let mut same_day = return_with("BUENO");
    same_day.returned_on = day(-2);
    assignment_service::return_assignment(&fx.db, created.id, same_day, &fx.actor)
        .await
        .unwrap();
    assert_eq!(state_of(&fx.db, phone.id).await, AssetState::Available);
}

#[tokio::test]
async fn test_repeated_sticker_kind_appends_rows() {
    let fx = setup().await;
    let media = tempfile::tempdir().unwrap();
    let phone = register_phone(&fx, "FP-016").await;
    let renderer = assetdesk::labels::RasterRenderer;
    let qr = vec!["QR".to_string()];

    let first = sticker_service::generate(&fx.db, &renderer, media.path(), phone.id, &qr, &fx.actor)
        .await
        .unwrap();
    let second = sticker_service::generate(&fx.db, &renderer, media.path(), phone.id, &qr, &fx.actor)
        .await
        .unwrap();
    assert_ne!(first[0].id, second[0].id);
    assert_ne!(first[0].image_path, second[0].image_path);

    let active = sticker::Entity::find()
        .filter(sticker::Column::ProductId.eq(phone.id))
        .filter(sticker::Column::Active.eq(true))
        .all(&fx.db)
        .await
        .unwrap();
    assert_eq!(active.len(), 2);
    for row in &active {
        assert!(media.path().join(row.image_path.as_deref().unwrap()).exists());
    }
}
