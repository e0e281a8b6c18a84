//! Error types for territory operations.
//!
//! Arbitration rejections are not errors: they come back as
//! [`Outcome::Rejected`](crate::arbitration::Outcome::Rejected) with a reason.
//! Geometry functions never fail; they return degenerate values instead.

use crate::session::RunPhase;

/// All errors that can occur in session, store and claim operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TerritoryError {
    // ─────────────────────────────────────────────────────────────────────
    // Session Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Cannot {action} while session is {from:?}")]
    InvalidTransition { from: RunPhase, action: &'static str },

    // ─────────────────────────────────────────────────────────────────────
    // Store Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store write failed: {0}")]
    StoreWriteFailed(String),

    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Zone {zone_id} changed since it was read")]
    Conflict { zone_id: String },
}

/// Convenience type alias for Results using TerritoryError.
pub type Result<T> = std::result::Result<T, TerritoryError>;

impl TerritoryError {
    /// Whether the failure came from the persistence boundary.
    ///
    /// A session that hits one of these during a claim stays in
    /// [`RunPhase::Claiming`] so the caller can retry or abandon.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            TerritoryError::StoreUnavailable(_)
                | TerritoryError::StoreWriteFailed(_)
                | TerritoryError::Conflict { .. }
        )
    }
}

impl From<TerritoryError> for String {
    fn from(err: TerritoryError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = TerritoryError::InvalidTransition {
            from: RunPhase::Idle,
            action: "stop",
        };
        assert_eq!(err.to_string(), "Cannot stop while session is Idle");
        assert_eq!(
            TerritoryError::Conflict { zone_id: "z1".into() }.to_string(),
            "Zone z1 changed since it was read"
        );
    }

    #[test]
    fn test_store_failure_classification() {
        assert!(TerritoryError::StoreWriteFailed("timeout".into()).is_store_failure());
        assert!(TerritoryError::Conflict { zone_id: "z".into() }.is_store_failure());
        assert!(!TerritoryError::PermissionDenied.is_store_failure());
        assert!(!TerritoryError::ZoneNotFound("z".into()).is_store_failure());
    }
}
