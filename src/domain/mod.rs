//! Domain layer - business rules that don't depend on HTTP
//!
//! The lifecycle table, identifier generation and the typed view of JSON
//! attribute blobs live here, together with the repository contracts.

pub mod attributes;
pub mod errors;
pub mod identifiers;
pub mod lifecycle;
pub mod repositories;

pub use errors::DomainError;
pub use lifecycle::{LifecycleEvent, TransitionError};
pub use repositories::*;
