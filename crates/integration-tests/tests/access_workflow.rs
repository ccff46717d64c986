//! Integration tests for the access request lifecycle.
//!
//! These tests cover status transitions and how workflow failures surface
//! over HTTP, without a database.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use granary_core::{AccessRequestStatus, Decision, Role};
use granary_server::db::RepositoryError;
use granary_server::error::AppError;

// =============================================================================
// Status Transitions
// =============================================================================

#[test]
fn test_pending_can_be_decided_once() {
    assert_eq!(
        AccessRequestStatus::Pending.transition(Decision::Approve),
        Ok(AccessRequestStatus::Approved)
    );
    assert_eq!(
        AccessRequestStatus::Pending.transition(Decision::Decline),
        Ok(AccessRequestStatus::Declined)
    );
}

#[test]
fn test_decided_requests_are_terminal() {
    for status in [AccessRequestStatus::Approved, AccessRequestStatus::Declined] {
        assert!(status.is_terminal());
        for decision in [Decision::Approve, Decision::Decline] {
            let err = status.transition(decision).unwrap_err();
            assert_eq!(err.current, status);
        }
    }
    assert!(!AccessRequestStatus::Pending.is_terminal());
}

#[test]
fn test_second_decision_is_a_conflict() {
    let err = AccessRequestStatus::Approved
        .transition(Decision::Decline)
        .unwrap_err();
    let app_err = AppError::from(err);

    assert_eq!(app_err.status(), StatusCode::CONFLICT);
    assert_eq!(app_err.public_message(), "access request is already APPROVED");
}

#[test]
fn test_status_wire_format() {
    assert_eq!(
        serde_json::to_value(AccessRequestStatus::Declined).unwrap(),
        "DECLINED"
    );
    assert_eq!(
        "pending".parse::<AccessRequestStatus>().unwrap(),
        AccessRequestStatus::Pending
    );
}

// =============================================================================
// Roles
// =============================================================================

#[test]
fn test_only_managers_review() {
    let reviewers: Vec<_> = Role::ALL
        .into_iter()
        .filter(|r| r.can_review_access())
        .collect();
    assert_eq!(reviewers, [Role::Owner, Role::Admin, Role::It]);
}

#[test]
fn test_guest_is_not_staff() {
    assert!(!Role::Guest.is_staff());
    assert!(Role::Operator.is_staff());
}

// =============================================================================
// Error Mapping
// =============================================================================

#[test]
fn test_missing_request_is_404() {
    assert_eq!(
        AppError::from(RepositoryError::NotFound).status(),
        StatusCode::NOT_FOUND
    );
}

#[test]
fn test_database_details_are_hidden() {
    let err = AppError::from(RepositoryError::DataCorruption(
        "invalid role 'ROOT'".to_string(),
    ));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.public_message(), "Internal server error");
}
