//! Role guards. Run after `require_auth` has injected `AuthUser`.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::AuthUser;
use crate::clinic::ensure_role;
use crate::models::Role;

pub async fn require_patient(req: Request<axum::body::Body>, next: Next) -> Response {
    guard(Role::Patient, req, next).await
}

pub async fn require_doctor(req: Request<axum::body::Body>, next: Next) -> Response {
    guard(Role::Doctor, req, next).await
}

pub async fn require_admin(req: Request<axum::body::Body>, next: Next) -> Response {
    guard(Role::Admin, req, next).await
}

async fn guard(role: Role, req: Request<axum::body::Body>, next: Next) -> Response {
    match check(role, &req) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

fn check(role: Role, req: &Request<axum::body::Body>) -> Result<(), ApiError> {
    let AuthUser(user) = req
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::Unauthorized("No token, authorization denied".into()))?;

    ensure_role(user, role).map_err(|err| {
        tracing::warn!(
            user_id = %user.id,
            role = %user.role,
            required = %role,
            "Role guard rejected request"
        );
        ApiError::from(err)
    })
}
