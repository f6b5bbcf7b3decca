use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

/// Schema, leaf tables first. Every statement is idempotent.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        code TEXT NOT NULL UNIQUE,
        specific_fields TEXT NOT NULL DEFAULT '{}',
        active BOOLEAN NOT NULL DEFAULT 1,
        created_by INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (created_by) REFERENCES users(id) ON DELETE SET NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS brands (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        active BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS suppliers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        tax_id TEXT NOT NULL UNIQUE,
        phone TEXT,
        email TEXT,
        address TEXT,
        active BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS departments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        code TEXT NOT NULL UNIQUE,
        description TEXT,
        manager_user_id INTEGER,
        created_by INTEGER,
        active BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (manager_user_id) REFERENCES users(id) ON DELETE SET NULL,
        FOREIGN KEY (created_by) REFERENCES users(id) ON DELETE SET NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS employees (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        national_id TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        phone TEXT,
        department_id INTEGER NOT NULL,
        position TEXT,
        active BOOLEAN NOT NULL DEFAULT 1,
        hired_on TEXT NOT NULL,
        left_on TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (department_id) REFERENCES departments(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS locations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        building TEXT,
        floor TEXT,
        room TEXT,
        description TEXT,
        active BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        internal_id TEXT NOT NULL UNIQUE,
        category_id INTEGER NOT NULL,
        brand_id INTEGER NOT NULL,
        model TEXT NOT NULL,
        image_path TEXT,
        serial_number TEXT NOT NULL UNIQUE,
        barcode TEXT UNIQUE,
        state TEXT NOT NULL DEFAULT 'DISPONIBLE',
        condition TEXT NOT NULL DEFAULT 'NUEVO',
        supplier_id INTEGER,
        purchased_on TEXT NOT NULL,
        purchase_price REAL NOT NULL CHECK (purchase_price >= 0),
        invoice_number TEXT,
        warranty_ends_on TEXT,
        location_id INTEGER,
        specifications TEXT NOT NULL DEFAULT '{}',
        notes TEXT,
        active BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (category_id) REFERENCES categories(id),
        FOREIGN KEY (brand_id) REFERENCES brands(id),
        FOREIGN KEY (supplier_id) REFERENCES suppliers(id) ON DELETE SET NULL,
        FOREIGN KEY (location_id) REFERENCES locations(id) ON DELETE SET NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_products_state ON products(state)",
    "CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id)",
    r#"
    CREATE TABLE IF NOT EXISTS assignments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id INTEGER NOT NULL,
        employee_id INTEGER,
        department_id INTEGER NOT NULL,
        kind TEXT NOT NULL,
        delivered_at TEXT NOT NULL,
        returned_at TEXT,
        expected_return_on TEXT,
        return_reason TEXT,
        delivery_notes TEXT,
        return_notes TEXT,
        delivered_by INTEGER NOT NULL,
        returned_by INTEGER,
        delivery_document TEXT,
        return_document TEXT,
        condition_on_delivery TEXT NOT NULL,
        condition_on_return TEXT,
        confirmed_by_employee BOOLEAN NOT NULL DEFAULT 0,
        confirmed_at TEXT,
        active BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE,
        FOREIGN KEY (employee_id) REFERENCES employees(id),
        FOREIGN KEY (department_id) REFERENCES departments(id),
        FOREIGN KEY (delivered_by) REFERENCES users(id),
        FOREIGN KEY (returned_by) REFERENCES users(id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_assignments_product ON assignments(product_id, delivered_at)",
    "CREATE INDEX IF NOT EXISTS idx_assignments_employee ON assignments(employee_id)",
    r#"
    CREATE TABLE IF NOT EXISTS stock_movements (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id INTEGER NOT NULL,
        kind TEXT NOT NULL,
        user_id INTEGER NOT NULL,
        origin TEXT,
        destination TEXT,
        description TEXT NOT NULL,
        previous_values TEXT NOT NULL DEFAULT '{}',
        new_values TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE,
        FOREIGN KEY (user_id) REFERENCES users(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product_types (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        code_prefix TEXT NOT NULL UNIQUE,
        description TEXT,
        custom_fields TEXT NOT NULL DEFAULT '{}',
        last_number INTEGER NOT NULL DEFAULT 0,
        active BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product_type_categories (
        product_type_id INTEGER NOT NULL,
        category_id INTEGER NOT NULL,
        PRIMARY KEY (product_type_id, category_id),
        FOREIGN KEY (product_type_id) REFERENCES product_types(id) ON DELETE CASCADE,
        FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS custom_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id INTEGER NOT NULL UNIQUE,
        product_type_id INTEGER NOT NULL,
        data TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE,
        FOREIGN KEY (product_type_id) REFERENCES product_types(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stickers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id INTEGER NOT NULL,
        kind TEXT NOT NULL,
        generated_code TEXT NOT NULL,
        image_path TEXT,
        generated_at TEXT NOT NULL,
        printed BOOLEAN NOT NULL DEFAULT 0,
        printed_at TEXT,
        active BOOLEAN NOT NULL DEFAULT 1,
        FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE
    )
    "#,
];

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    for sql in SCHEMA {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            sql.to_string(),
        ))
        .await?;
    }

    Ok(())
}
