//! Roles and status enums.
//!
//! Both enums are stored as Postgres enum types (`user_role`,
//! `access_request_status`) and serialized in `SCREAMING_SNAKE_CASE` so the
//! mini-app sees the same spelling as the database.

use serde::{Deserialize, Serialize};

/// User role with different permission levels.
///
/// New users start as [`Role::Guest`] and get [`Role::Operator`] either from
/// an approved access request or by sharing an allowlisted phone number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Business owner; full access.
    Owner,
    /// Manages users, products and access requests.
    Admin,
    /// Technical support; same management rights as admins.
    It,
    /// Records receipts and shift consumption.
    Operator,
    /// Authenticated but without access to inventory data.
    #[default]
    Guest,
}

impl Role {
    /// All roles, most privileged first.
    pub const ALL: [Self; 5] = [
        Self::Owner,
        Self::Admin,
        Self::It,
        Self::Operator,
        Self::Guest,
    ];

    /// Roles shown in the employee list (`OPERATOR`, `ADMIN`).
    #[must_use]
    pub const fn is_employee(self) -> bool {
        matches!(self, Self::Operator | Self::Admin)
    }

    /// Anyone allowed to read inventory and record stock movements.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        !matches!(self, Self::Guest)
    }

    /// Manage users, products and the phone allowlist.
    #[must_use]
    pub const fn can_manage_users(self) -> bool {
        matches!(self, Self::Owner | Self::Admin | Self::It)
    }

    /// Approve or decline access requests.
    #[must_use]
    pub const fn can_review_access(self) -> bool {
        self.can_manage_users()
    }

    /// The database/wire spelling of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Admin => "ADMIN",
            Self::It => "IT",
            Self::Operator => "OPERATOR",
            Self::Guest => "GUEST",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == upper)
            .ok_or_else(|| format!("invalid role: {s}"))
    }
}

/// Access request lifecycle.
///
/// ```text
/// PENDING -> APPROVED
/// PENDING -> DECLINED
/// ```
///
/// Approved and declined requests are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "access_request_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessRequestStatus {
    #[default]
    Pending,
    Approved,
    Declined,
}

/// A reviewer's decision on an access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Decline,
}

/// Attempted to decide on a request that already left `PENDING`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("access request is already {current}")]
pub struct TransitionError {
    /// Status the request was in.
    pub current: AccessRequestStatus,
}

impl AccessRequestStatus {
    /// Whether no further decision can be applied.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Apply a decision, returning the resulting status.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] unless the request is still pending.
    pub const fn transition(self, decision: Decision) -> Result<Self, TransitionError> {
        match (self, decision) {
            (Self::Pending, Decision::Approve) => Ok(Self::Approved),
            (Self::Pending, Decision::Decline) => Ok(Self::Declined),
            (current, _) => Err(TransitionError { current }),
        }
    }

    /// The database/wire spelling of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Declined => "DECLINED",
        }
    }
}

impl std::fmt::Display for AccessRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccessRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "DECLINED" => Ok(Self::Declined),
            _ => Err(format!("invalid access request status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_display() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert_eq!("operator".parse::<Role>().unwrap(), Role::Operator);
        assert!("ROOT".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Owner.can_manage_users());
        assert!(Role::It.can_review_access());
        assert!(!Role::Operator.can_manage_users());
        assert!(Role::Operator.is_staff());
        assert!(!Role::Guest.is_staff());
        assert!(Role::Admin.is_employee());
        assert!(!Role::Owner.is_employee());
        assert!(!Role::It.is_employee());
    }

    #[test]
    fn test_role_serde_spelling() {
        assert_eq!(serde_json::to_string(&Role::It).unwrap(), "\"IT\"");
        let role: Role = serde_json::from_str("\"OPERATOR\"").unwrap();
        assert_eq!(role, Role::Operator);
        assert_eq!(Role::default(), Role::Guest);
    }

    #[test]
    fn test_pending_transitions() {
        let pending = AccessRequestStatus::Pending;
        assert_eq!(
            pending.transition(Decision::Approve),
            Ok(AccessRequestStatus::Approved)
        );
        assert_eq!(
            pending.transition(Decision::Decline),
            Ok(AccessRequestStatus::Declined)
        );
    }

    #[test]
    fn test_terminal_statuses_reject_decisions() {
        for status in [AccessRequestStatus::Approved, AccessRequestStatus::Declined] {
            assert!(status.is_terminal());
            for decision in [Decision::Approve, Decision::Decline] {
                let err = status.transition(decision).unwrap_err();
                assert_eq!(err.current, status);
            }
        }
    }

    #[test]
    fn test_transition_error_message() {
        let err = AccessRequestStatus::Declined
            .transition(Decision::Approve)
            .unwrap_err();
        assert_eq!(err.to_string(), "access request is already DECLINED");
    }
}
