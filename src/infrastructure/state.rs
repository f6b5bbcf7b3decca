//! Application state containing repositories and shared resources

use axum::extract::FromRef;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::infrastructure::config::Config;
use crate::infrastructure::{
    SeaOrmBrandRepository, SeaOrmCategoryRepository, SeaOrmDepartmentRepository,
    SeaOrmEmployeeRepository, SeaOrmLocationRepository, SeaOrmSupplierRepository,
};
use crate::labels::{RasterRenderer, StickerRenderer};
use crate::services::{LogMailer, Mailer};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub config: Arc<Config>,
    pub categories: Arc<SeaOrmCategoryRepository>,
    pub brands: Arc<SeaOrmBrandRepository>,
    pub suppliers: Arc<SeaOrmSupplierRepository>,
    pub departments: Arc<SeaOrmDepartmentRepository>,
    pub employees: Arc<SeaOrmEmployeeRepository>,
    pub locations: Arc<SeaOrmLocationRepository>,
    pub renderer: Arc<dyn StickerRenderer>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Create a new AppState with all repositories initialized
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        Self {
            categories: Arc::new(SeaOrmCategoryRepository::new(db.clone())),
            brands: Arc::new(SeaOrmBrandRepository::new(db.clone())),
            suppliers: Arc::new(SeaOrmSupplierRepository::new(db.clone())),
            departments: Arc::new(SeaOrmDepartmentRepository::new(db.clone())),
            employees: Arc::new(SeaOrmEmployeeRepository::new(db.clone())),
            locations: Arc::new(SeaOrmLocationRepository::new(db.clone())),
            renderer: Arc::new(RasterRenderer),
            mailer: Arc::new(LogMailer),
            config: Arc::new(config),
            db,
        }
    }

    /// Swap the outgoing mail transport
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn StickerRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

// Lets the generic catalog handlers extract their repository directly
macro_rules! repository_from_state {
    ($($repo:ty => $field:ident),* $(,)?) => {
        $(
            impl FromRef<AppState> for Arc<$repo> {
                fn from_ref(state: &AppState) -> Self {
                    state.$field.clone()
                }
            }
        )*
    };
}

repository_from_state! {
    SeaOrmCategoryRepository => categories,
    SeaOrmBrandRepository => brands,
    SeaOrmSupplierRepository => suppliers,
    SeaOrmDepartmentRepository => departments,
    SeaOrmEmployeeRepository => employees,
    SeaOrmLocationRepository => locations,
}
