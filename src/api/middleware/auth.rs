//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, verifies it, re-reads the
//! user it names from storage and injects `AuthUser` into request
//! extensions for the role guards and handlers.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthUser};
use crate::clinic::accounts;

/// Require a valid bearer token naming an existing user.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

fn bearer_token(req: &Request<axum::body::Body>) -> Option<String> {
    let value = req.headers().get("Authorization")?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    // 1. Extract bearer token
    let token = bearer_token(&req)
        .ok_or_else(|| ApiError::Unauthorized("No token, authorization denied".into()))?;

    // 2. Verify and resolve to a live user (role comes from storage)
    let user = ctx
        .with_db(move |core, conn| {
            accounts::resolve_bearer(conn, &core.tokens, &token).map_err(ApiError::from)
        })
        .await?;

    // 3. Inject the caller for downstream guards and handlers
    let auth = AuthUser(user);
    req.extensions_mut().insert(auth.clone());

    // 4. Process request; expose the caller to the access log
    let mut response = next.run(req).await;
    response.extensions_mut().insert(auth);
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));

    Ok(response)
}
