//! Services Layer
//!
//! Business operations over the database, one module per aggregate. HTTP
//! handlers in `api` are thin wrappers around these functions.

pub mod assignment_service;
pub mod mailer;
pub mod movement_service;
pub mod product_service;
pub mod product_type_service;
pub mod report_service;
pub mod sticker_service;

pub use mailer::{LogMailer, Mailer, OutgoingMail};

use crate::auth::Claims;
use crate::domain::DomainError;

/// The authenticated user performing an operation
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: i32,
    pub username: String,
    pub is_admin: bool,
}

impl Actor {
    pub fn require_admin(&self, action: &str) -> Result<(), DomainError> {
        if self.is_admin {
            Ok(())
        } else {
            tracing::warn!(user = %self.username, action, "permission denied");
            Err(DomainError::Permission(format!(
                "Only administrators can {}",
                action
            )))
        }
    }
}

impl From<&Claims> for Actor {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.uid,
            username: claims.sub.clone(),
            is_admin: claims.is_admin(),
        }
    }
}
