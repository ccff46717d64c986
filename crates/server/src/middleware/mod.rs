//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span with method, uri, request and user IDs)
//! 3. Request ID (reuse or generate `x-request-id`)
//! 4. CORS for the mini-app origins
//!
//! Authentication is not a layer: handlers opt in with the [`TelegramAuth`]
//! and [`RequireRole`] extractors.

pub mod auth;
pub mod request_id;

pub use auth::{EmployeeViewers, Managers, RequireRole, RolePolicy, Staff, TelegramAuth};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
