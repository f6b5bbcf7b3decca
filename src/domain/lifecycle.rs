//! Asset lifecycle
//!
//! Every state change an asset can go through is listed in [`AssetState::apply`].
//! Services never assign `state` directly; they ask the table for the next state
//! and persist what it returns.

use std::fmt;

use crate::models::{AssetState, AssignmentKind};

/// Something that happens to an asset
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// A hand-over that leaves the asset with the recipient (ENTREGA, PRESTAMO)
    Deliver(AssignmentKind),
    /// Any other assignment kind; recorded in the ledger without moving the asset
    Record(AssignmentKind),
    /// The open assignment is closed; carries the free-text condition reported on return
    Return(String),
    /// Manual admin edit
    Override(AssetState),
}

impl LifecycleEvent {
    /// Event produced by creating an assignment of the given kind
    pub fn for_assignment(kind: AssignmentKind) -> Self {
        if kind.holds_asset() {
            LifecycleEvent::Deliver(kind)
        } else {
            LifecycleEvent::Record(kind)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionError {
    pub from: AssetState,
    pub event: LifecycleEvent,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.event {
            LifecycleEvent::Deliver(_) | LifecycleEvent::Record(_) => write!(
                f,
                "The product is not available (current state: {})",
                self.from.wire()
            ),
            LifecycleEvent::Return(_) => write!(
                f,
                "The product cannot be returned from state {}",
                self.from.wire()
            ),
            LifecycleEvent::Override(to) => write!(
                f,
                "Cannot change state from {} to {}",
                self.from.wire(),
                to.wire()
            ),
        }
    }
}

impl std::error::Error for TransitionError {}

impl AssignmentKind {
    /// Kinds that take the asset out of the warehouse
    pub fn holds_asset(&self) -> bool {
        matches!(self, AssignmentKind::Delivery | AssignmentKind::Loan)
    }
}

impl AssetState {
    /// Wire value, as stored and serialized
    pub fn wire(&self) -> &'static str {
        match self {
            AssetState::Available => "DISPONIBLE",
            AssetState::Delivered => "ENTREGADO",
            AssetState::Faulty => "AVERIADO",
            AssetState::Broken => "ROTO",
            AssetState::Collected => "RECOGIDO",
            AssetState::Retired => "BAJA",
            AssetState::Maintenance => "MANTENIMIENTO",
        }
    }

    /// The transition table.
    ///
    /// | from         | event             | to                               |
    /// |--------------|-------------------|----------------------------------|
    /// | DISPONIBLE   | Deliver(kind)     | ENTREGADO                        |
    /// | DISPONIBLE   | Record(kind)      | DISPONIBLE                       |
    /// | any          | Return(condition) | `state_after_return(condition)`  |
    /// | any          | Override(s)       | s                                |
    ///
    /// `Return` is guarded by the assignment being open, which the caller checks;
    /// the asset's own state does not restrict it.
    pub fn apply(self, event: &LifecycleEvent) -> Result<AssetState, TransitionError> {
        match (self, event) {
            (AssetState::Available, LifecycleEvent::Deliver(_)) => Ok(AssetState::Delivered),
            (AssetState::Available, LifecycleEvent::Record(_)) => Ok(AssetState::Available),
            (_, LifecycleEvent::Return(condition)) => Ok(state_after_return(condition)),
            (_, LifecycleEvent::Override(to)) => Ok(*to),
            (from, event) => Err(TransitionError {
                from,
                event: event.clone(),
            }),
        }
    }
}

/// State an asset lands in after a return, decided by the reported condition.
///
/// Only the exact values `AVERIADO` and `MANTENIMIENTO` are recognised;
/// everything else, including `averiado`, `ROTO` or an empty string, puts the
/// asset back in stock as `DISPONIBLE`.
pub fn state_after_return(condition: &str) -> AssetState {
    match condition {
        "AVERIADO" => AssetState::Faulty,
        "MANTENIMIENTO" => AssetState::Maintenance,
        _ => AssetState::Available,
    }
}
