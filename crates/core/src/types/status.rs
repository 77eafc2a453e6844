//! Status and role enums.

use serde::{Deserialize, Serialize};

/// Attempted an invalid payment-status transition.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid transaction status transition: {from} -> {to}")]
pub struct TransitionError {
    /// Status the transaction currently holds.
    pub from: TransactionStatus,
    /// Status the caller tried to move to.
    pub to: TransactionStatus,
}

/// Lifecycle of a merchandise purchase.
///
/// The only legal transitions are `initiated -> completed` and
/// `initiated -> failed`; both end states are terminal. Verification code
/// must treat a repeated `completed` observation as idempotent success, never
/// as a second fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Payment session opened with the gateway; outcome unknown.
    #[default]
    Initiated,
    /// Gateway confirmed payment and stock was handed over.
    Completed,
    /// Payment rejected, aborted, or stock ran out before hand-over.
    Failed,
}

impl TransactionStatus {
    /// Whether this status can move to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Initiated, Self::Completed) | (Self::Initiated, Self::Failed)
        )
    }

    /// Whether this status is an end state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Validate and perform a transition.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the move is not
    /// `initiated -> completed` or `initiated -> failed`.
    pub fn transition_to(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initiated => write!(f, "initiated"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(Self::Initiated),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid transaction status: {s}")),
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular listener / artist account.
    #[default]
    User,
    /// Moderation access to users, songs, and support messages.
    Admin,
}

impl UserRole {
    /// Whether this role grants admin access.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(TransactionStatus::Initiated.can_transition_to(TransactionStatus::Completed));
        assert!(TransactionStatus::Initiated.can_transition_to(TransactionStatus::Failed));
    }

    #[test]
    fn test_no_backwards_transitions() {
        for terminal in [TransactionStatus::Completed, TransactionStatus::Failed] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(TransactionStatus::Initiated));
            assert!(!terminal.can_transition_to(TransactionStatus::Completed));
            assert!(!terminal.can_transition_to(TransactionStatus::Failed));
        }
        assert!(!TransactionStatus::Initiated.can_transition_to(TransactionStatus::Initiated));
    }

    #[test]
    fn test_transition_to_reports_endpoints() {
        let err = TransactionStatus::Completed
            .transition_to(TransactionStatus::Failed)
            .unwrap_err();
        assert_eq!(err.from, TransactionStatus::Completed);
        assert_eq!(err.to, TransactionStatus::Failed);
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            TransactionStatus::Initiated,
            TransactionStatus::Completed,
            TransactionStatus::Failed,
        ] {
            let parsed: TransactionStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("paid".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&TransactionStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }

    #[test]
    fn test_role_roundtrip() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!(UserRole::User.to_string(), "user");
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::User.is_admin());
        assert!("root".parse::<UserRole>().is_err());
    }
}
