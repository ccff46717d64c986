//! Authentication and authorization extractors.
//!
//! Every API request carries the mini-app's raw init data:
//!
//! ```text
//! Authorization: tma <initDataRaw>
//! ```
//!
//! [`TelegramAuth`] verifies it, upserts the user and hands the handler the
//! stored [`User`]. [`RequireRole`] additionally checks the user's role
//! against a [`RolePolicy`].

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use granary_core::Role;
use secrecy::ExposeSecret;
use tracing::{Span, debug};

use crate::db::UserRepository;
use crate::db::users::ProfileUpsert;
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::init_data;
use crate::state::AppState;

/// Authorization scheme used by Telegram mini-apps.
pub const AUTH_SCHEME: &str = "tma";

/// Verify raw init data and upsert the user it describes.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` if the data fails verification, or a
/// database error if the upsert fails.
pub async fn authenticate(state: &AppState, raw: &str) -> Result<User, AppError> {
    let telegram = &state.config().telegram;
    let verified = init_data::verify(
        raw,
        telegram.bot_token.expose_secret(),
        Utc::now(),
        telegram.init_data_max_age,
    )
    .map_err(|e| {
        debug!(error = %e, "Init data rejected");
        AppError::Unauthorized(e.to_string())
    })?;

    let profile = ProfileUpsert {
        telegram_id: verified.user.id,
        username: verified.user.username.as_deref(),
        first_name: verified.user.first_name.as_deref(),
        last_name: verified.user.last_name.as_deref(),
    };
    let user = UserRepository::new(state.pool())
        .upsert_profile(profile, Some(&verified.to_json()))
        .await?;

    set_sentry_user(user.id.as_i32(), user.username.as_deref());
    Span::current().record("user_id", user.id.as_i32());

    Ok(user)
}

/// Extract the init data from an `Authorization: tma ...` header value.
fn init_data_from_header(value: &str) -> Option<&str> {
    let (scheme, raw) = value.trim().split_once(' ')?;
    let raw = raw.trim();
    (scheme.eq_ignore_ascii_case(AUTH_SCHEME) && !raw.is_empty()).then_some(raw)
}

/// Extractor that requires valid Telegram init data.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(TelegramAuth(user): TelegramAuth) -> Json<User> {
///     Json(user)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TelegramAuth(pub User);

impl FromRequestParts<AppState> for TelegramAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Already authenticated by another extractor on this request
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(Self(user.clone()));
        }

        let raw = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(init_data_from_header)
            .ok_or_else(|| AppError::Unauthorized("missing tma authorization".to_string()))?;

        let user = authenticate(state, raw).await?;
        parts.extensions.insert(user.clone());
        Ok(Self(user))
    }
}

/// Which roles may use a route.
pub trait RolePolicy {
    /// Whether `role` passes this policy.
    fn allows(role: Role) -> bool;
}

/// OWNER, ADMIN and IT.
#[derive(Debug)]
pub struct Managers;

impl RolePolicy for Managers {
    fn allows(role: Role) -> bool {
        role.can_manage_users()
    }
}

/// Every role except GUEST.
#[derive(Debug)]
pub struct Staff;

impl RolePolicy for Staff {
    fn allows(role: Role) -> bool {
        role.is_staff()
    }
}

/// Roles that may see the employee list: ADMIN, OWNER and OPERATOR.
#[derive(Debug)]
pub struct EmployeeViewers;

impl RolePolicy for EmployeeViewers {
    fn allows(role: Role) -> bool {
        matches!(role, Role::Admin | Role::Owner | Role::Operator)
    }
}

/// Extractor that requires authentication and a role allowed by `P`.
///
/// Responds 401 when unauthenticated and 403 when the role is not allowed.
#[derive(Debug)]
pub struct RequireRole<P>(pub User, pub PhantomData<P>);

impl<P> RequireRole<P> {
    /// The authenticated user.
    #[must_use]
    pub fn into_user(self) -> User {
        self.0
    }
}

impl<P> FromRequestParts<AppState> for RequireRole<P>
where
    P: RolePolicy + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TelegramAuth(user) = TelegramAuth::from_request_parts(parts, state).await?;

        if !P::allows(user.role) {
            return Err(AppError::Forbidden(format!(
                "role {} is not allowed here",
                user.role
            )));
        }

        Ok(Self(user, PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_data_from_header() {
        assert_eq!(init_data_from_header("tma a=1&hash=ff"), Some("a=1&hash=ff"));
        assert_eq!(init_data_from_header("TMA  a=1 "), Some("a=1"));
        assert_eq!(init_data_from_header("Bearer a=1"), None);
        assert_eq!(init_data_from_header("tma "), None);
        assert_eq!(init_data_from_header("tma"), None);
    }

    #[test]
    fn test_managers_policy() {
        assert!(Managers::allows(Role::Owner));
        assert!(Managers::allows(Role::Admin));
        assert!(Managers::allows(Role::It));
        assert!(!Managers::allows(Role::Operator));
        assert!(!Managers::allows(Role::Guest));
    }

    #[test]
    fn test_staff_policy() {
        assert!(Staff::allows(Role::Operator));
        assert!(Staff::allows(Role::It));
        assert!(!Staff::allows(Role::Guest));
    }

    #[test]
    fn test_employee_viewers_policy() {
        assert!(EmployeeViewers::allows(Role::Admin));
        assert!(EmployeeViewers::allows(Role::Owner));
        assert!(EmployeeViewers::allows(Role::Operator));
        assert!(!EmployeeViewers::allows(Role::It));
        assert!(!EmployeeViewers::allows(Role::Guest));
    }
}
