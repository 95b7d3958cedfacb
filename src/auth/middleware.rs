//! Auth middleware for Axum routes.
//!
//! Validates JWT Bearer tokens and injects Claims into request extensions.
//! Implements deny-by-default: if `auth_config` is None, all requests are
//! rejected.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::api::handlers::{ApiState, AppError};
use crate::auth::jwt::decode_jwt;

/// Middleware that requires a valid JWT Bearer token.
///
/// # Behavior
/// 1. If `auth_config` is `None` → 403 Forbidden (deny-by-default)
/// 2. Extract `Authorization: Bearer <token>` header → 401 if missing
/// 3. Validate JWT with the configured secret → 401 if invalid/expired
/// 4. Check `allowed_email_domain` if configured → 403 if domain mismatch
/// 5. Inject `Claims` into request extensions for downstream handlers
pub async fn require_auth(
    State(state): State<ApiState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_config = state.auth_config.as_ref().ok_or_else(|| {
        AppError::Forbidden("Authentication not configured — access denied".to_string())
    })?;

    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header format".to_string()))?;

    let claims = decode_jwt(token, &auth_config.jwt_secret)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    if let Some(ref domain) = auth_config.allowed_email_domain {
        if !claims.email.ends_with(&format!("@{}", domain)) {
            return Err(AppError::Forbidden(format!(
                "Email domain not allowed (expected @{})",
                domain
            )));
        }
    }

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::encode_jwt;
    use crate::test_helpers::{mock_server_state, test_auth_config, TEST_SECRET};
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    /// Build a test router with the auth middleware applied
    fn test_app(auth: Option<crate::AuthConfig>) -> Router {
        let state = mock_server_state(auth);

        async fn ok_handler() -> &'static str {
            "ok"
        }

        Router::new()
            .route("/test", get(ok_handler))
            .layer(from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_no_auth_config_returns_403() {
        let app = test_app(None);

        let req = HttpRequest::builder()
            .uri("/test")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_no_header_returns_401() {
        let app = test_app(Some(test_auth_config()));

        let req = HttpRequest::builder()
            .uri("/test")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_token_returns_401() {
        let app = test_app(Some(test_auth_config()));

        let req = HttpRequest::builder()
            .uri("/test")
            .header("authorization", "Bearer invalid.token.here")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_passes() {
        let app = test_app(Some(test_auth_config()));

        let token = encode_jwt(
            uuid::Uuid::new_v4(),
            "alice@example.com",
            "Alice",
            TEST_SECRET,
            3600,
        )
        .unwrap();

        let req = HttpRequest::builder()
            .uri("/test")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_domain_returns_403() {
        let mut config = test_auth_config();
        config.allowed_email_domain = Some("example.com".to_string());
        let app = test_app(Some(config));

        let token = encode_jwt(
            uuid::Uuid::new_v4(),
            "alice@gmail.com",
            "Alice",
            TEST_SECRET,
            3600,
        )
        .unwrap();

        let req = HttpRequest::builder()
            .uri("/test")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_correct_domain_passes() {
        let mut config = test_auth_config();
        config.allowed_email_domain = Some("example.com".to_string());
        let app = test_app(Some(config));

        let token = encode_jwt(
            uuid::Uuid::new_v4(),
            "alice@example.com",
            "Alice",
            TEST_SECRET,
            3600,
        )
        .unwrap();

        let req = HttpRequest::builder()
            .uri("/test")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
