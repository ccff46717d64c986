//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Readiness (database ping)
//!
//! # Auth (any valid init data)
//! POST /api/auth/login                      - Verify init data, return id and role
//! GET  /api/auth/me                         - Current user
//! POST /api/auth/access-request             - Ask for operator access
//!
//! # Access requests (managers)
//! GET  /api/access-requests?status=         - List requests
//! POST /api/access-requests/{id}/approve    - Approve
//! POST /api/access-requests/{id}/decline    - Decline
//!
//! # Phone allowlist (managers)
//! GET    /api/allowed-phones                - List
//! POST   /api/allowed-phones                - Add
//! DELETE /api/allowed-phones/{id}           - Remove
//!
//! # Products (staff read, managers write)
//! GET    /api/products                      - List
//! GET    /api/products/{id}                 - Detail
//! POST   /api/products                      - Create
//! PATCH  /api/products/{id}                 - Update
//! DELETE /api/products/{id}                 - Delete
//!
//! # Stock movements (staff)
//! POST /api/receipts                        - Record a receipt
//! GET  /api/receipts?limit=                 - Recent receipts
//! POST /api/shifts                          - Record a shift report
//! GET  /api/shifts?limit=                   - Recent shift reports
//!
//! # Users
//! GET  /api/user?role=&onlyEmployees=       - List (managers)
//! GET  /api/user/employees                  - Employees (admin, owner, operator)
//! GET  /api/user/role/{role}                - By role (managers)
//! GET  /api/user/{telegramId}/role          - Role lookup (authenticated)
//! GET  /api/user/{id}                       - Detail (managers)
//! POST /api/user/update/{id}                - Update (managers)
//! POST /api/user/remove/{id}                - Delete (managers)
//! ```
//!
//! Successful responses are wrapped as `{"data": ...}`; errors are rendered by
//! [`AppError`](crate::error::AppError).

pub mod access_requests;
pub mod allowed_phones;
pub mod auth;
mod extract;
pub mod products;
pub mod receipts;
pub mod shifts;
pub mod users;

use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::{Span, warn};

pub use extract::{ApiJson, ApiPath, ApiQuery};

use crate::error::AppError;
use crate::middleware::{REQUEST_ID_HEADER, request_id_middleware};
use crate::state::AppState;

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiData<T>
where
    T: Serialize,
{
    pub data: T,
}

impl<T: Serialize> ApiData<T> {
    /// Wrap a payload.
    pub const fn new(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for ApiData<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<ApiData<T>, AppError>;

/// Build the `/api` router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(access_requests::router())
        .merge(allowed_phones::router())
        .merge(products::router())
        .merge(receipts::router())
        .merge(shifts::router())
        .merge(users::router())
}

/// Build the full application with middleware.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors_origins);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_router())
        .layer(cors)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the mini-app origins.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::config::AppConfig;

    const TOKEN: &str = "7012345678:AAHk3vQ9xZp2LmN8rT5wYb4cD6eF1gH0jKs";

    // The pool never connects; these requests are answered before any query.
    fn test_app() -> Router {
        let config = AppConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/granary_test".to_string()),
            "TG_BOT_TOKEN" => Some(TOKEN.to_string()),
            _ => None,
        })
        .unwrap();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/granary_test")
            .unwrap();
        app(AppState::new(config, pool))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_missing_authorization_is_401() {
        let response = test_app()
            .oneshot(Request::get("/api/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["status"], 401);
    }

    #[tokio::test]
    async fn test_forged_init_data_is_401() {
        let request = Request::get("/api/products")
            .header(header::AUTHORIZATION, "tma user=%7B%22id%22%3A1%7D&auth_date=1&hash=00ff")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_rejects_empty_init_data() {
        let request = Request::post("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"initData":""}"#))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_login_body_is_json_400() {
        let request = Request::post("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let json = body_json(response).await;
        assert_eq!(json["error"]["status"], 400);
        assert!(json["error"]["message"].as_str().unwrap().contains("JSON"));
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let request = Request::get("/health")
            .header(REQUEST_ID_HEADER, "req-123")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-123");
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_local_dev_origin() {
        let request = Request::options("/api/products")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }

    #[test]
    fn test_api_data_envelope() {
        let json = serde_json::to_value(ApiData::new(vec![1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({"data": [1, 2]}));
    }
}
