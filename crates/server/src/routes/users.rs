//! User management handlers.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use granary_core::{Role, TelegramId, UserId};
use serde::{Deserialize, Serialize};

use super::{ApiData, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::db::UserRepository;
use crate::error::AppError;
use crate::middleware::{EmployeeViewers, Managers, RequireRole, TelegramAuth};
use crate::models::{User, UserChanges};
use crate::state::AppState;

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user", get(list))
        .route("/user/employees", get(employees))
        .route("/user/role/{role}", get(by_role))
        .route("/user/update/{id}", post(update))
        .route("/user/remove/{id}", post(remove))
        .route("/user/{id}", get(show))
        .route("/user/{id}/role", get(role_of))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub role: Option<Role>,
    #[serde(default)]
    pub only_employees: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleLookup {
    pub telegram_id: TelegramId,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct Removed {
    pub id: UserId,
}

/// Users, newest first, optionally filtered.
///
/// # Errors
///
/// Returns 401/403 for non-managers.
pub async fn list(
    State(state): State<AppState>,
    _: RequireRole<Managers>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<User>> {
    let users = UserRepository::new(state.pool())
        .list(query.role, query.only_employees)
        .await?;
    Ok(ApiData::new(users))
}

/// Operators and admins.
///
/// # Errors
///
/// Returns 401/403 unless the caller is an owner, admin or operator.
pub async fn employees(
    State(state): State<AppState>,
    _: RequireRole<EmployeeViewers>,
) -> ApiResult<Vec<User>> {
    let users = UserRepository::new(state.pool()).list(None, true).await?;
    Ok(ApiData::new(users))
}

/// Users holding one role.
///
/// # Errors
///
/// Returns 400 for an unknown role name.
pub async fn by_role(
    State(state): State<AppState>,
    _: RequireRole<Managers>,
    ApiPath(role): ApiPath<String>,
) -> ApiResult<Vec<User>> {
    let role: Role = role.parse().map_err(AppError::BadRequest)?;
    let users = UserRepository::new(state.pool())
        .list(Some(role), false)
        .await?;
    Ok(ApiData::new(users))
}

/// Role of the account with the given Telegram ID.
///
/// # Errors
///
/// Returns 404 if no such user exists.
pub async fn role_of(
    State(state): State<AppState>,
    _: TelegramAuth,
    ApiPath(telegram_id): ApiPath<TelegramId>,
) -> ApiResult<RoleLookup> {
    let user = UserRepository::new(state.pool())
        .get_by_telegram_id(telegram_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {telegram_id} not found")))?;
    Ok(ApiData::new(RoleLookup {
        telegram_id: user.telegram_id,
        role: user.role,
    }))
}

/// A single user.
///
/// # Errors
///
/// Returns 404 if the user does not exist.
pub async fn show(
    State(state): State<AppState>,
    _: RequireRole<Managers>,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<User> {
    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User #{id} not found")))?;
    Ok(ApiData::new(user))
}

/// Partially update a user.
///
/// # Errors
///
/// Returns 400 for an empty update and 404 if the user does not exist.
pub async fn update(
    State(state): State<AppState>,
    RequireRole(manager, ..): RequireRole<Managers>,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(changes): ApiJson<UserChanges>,
) -> ApiResult<User> {
    if changes.is_empty() {
        return Err(AppError::BadRequest("nothing to update".to_string()));
    }
    let user = UserRepository::new(state.pool())
        .update(id, &changes)
        .await?;
    tracing::info!(
        user_id = %id,
        changed_by = %manager.id,
        role = ?changes.role,
        "User updated"
    );
    Ok(ApiData::new(user))
}

/// Delete a user.
///
/// # Errors
///
/// Returns 404 if the user does not exist.
pub async fn remove(
    State(state): State<AppState>,
    RequireRole(manager, ..): RequireRole<Managers>,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<Removed> {
    if id == manager.id {
        return Err(AppError::BadRequest("cannot remove yourself".to_string()));
    }
    UserRepository::new(state.pool()).delete(id).await?;
    tracing::info!(user_id = %id, removed_by = %manager.id, "User removed");
    Ok(ApiData::new(Removed { id }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query: ListQuery = serde_json::from_str("{}").unwrap();
        assert!(query.role.is_none());
        assert!(!query.only_employees);

        let query: ListQuery =
            serde_json::from_str(r#"{"role":"OPERATOR","onlyEmployees":true}"#).unwrap();
        assert_eq!(query.role, Some(Role::Operator));
        assert!(query.only_employees);
    }

    #[test]
    fn test_role_lookup_is_camel_case() {
        let json = serde_json::to_value(RoleLookup {
            telegram_id: TelegramId::new(42),
            role: Role::Admin,
        })
        .unwrap();
        assert_eq!(json["telegramId"], 42);
        assert_eq!(json["role"], "ADMIN");
    }
}
