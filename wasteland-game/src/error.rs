//! Error types shared across the simulation core and its adapters.
use thiserror::Error;

use crate::inventory::ItemKind;
use crate::ledger::{Resource, TerminalReason};

/// Rejections raised while resolving a player decision.
///
/// None of these mutate the session; callers re-prompt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("invalid choice '{token}'")]
    InvalidChoice { token: String },
    #[error("no {} left to take", .kind.label())]
    InsufficientStock { kind: ItemKind },
    #[error("the session has already ended ({reason})")]
    SessionOver { reason: TerminalReason },
}

impl ActionError {
    pub(crate) fn invalid(token: &str) -> Self {
        Self::InvalidChoice {
            token: token.trim().to_string(),
        }
    }
}

/// Reasons an externally supplied snapshot record is refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("unsupported snapshot schema {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },
    #[error("{resource} must be between 0 and 100 (got {value})")]
    ResourceOutOfRange { resource: Resource, value: i32 },
    #[error("day must be at least 1 (got {0})")]
    InvalidDay(u32),
    #[error("player name must not be empty")]
    EmptyPlayerName,
    #[error("player id '{0}' is not a valid storage key")]
    InvalidPlayerId(String),
    #[error("{} is not stocked in the bunker", .0.label())]
    InvalidBunkerItem(ItemKind),
}

/// Failures surfaced by persistence and entitlement gateways.
///
/// The in-memory session stays authoritative whenever one of these is
/// returned.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("no snapshot stored for '{0}'")]
    NotFound(String),
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored document could not be encoded or decoded: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("stored snapshot rejected: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("storage lock poisoned")]
    Poisoned,
}

impl PersistError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let err = ActionError::InsufficientStock {
            kind: ItemKind::MedKit,
        };
        assert_eq!(err.to_string(), "no med kit left to take");

        let err = SnapshotError::ResourceOutOfRange {
            resource: Resource::Food,
            value: 140,
        };
        assert_eq!(err.to_string(), "food must be between 0 and 100 (got 140)");

        let err = ActionError::invalid("  9 ");
        assert_eq!(err.to_string(), "invalid choice '9'");
    }

    #[test]
    fn not_found_is_distinguishable() {
        assert!(PersistError::NotFound("slot".into()).is_not_found());
        assert!(!PersistError::Poisoned.is_not_found());
    }
}
