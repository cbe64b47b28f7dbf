//! Authentication endpoints.
//!
//! `POST /api/auth/register`: patient self-registration
//! `POST /api/auth/login`: credentials exchanged for a bearer token

use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson};
use crate::clinic::accounts::{self, Registration};
use crate::models::{Role, User};

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub id: Uuid,
    pub name: String,
    pub username: String,
}

/// `POST /api/auth/register`: create a patient account.
pub async fn register(
    State(ctx): State<ApiContext>,
    ApiJson(input): ApiJson<Registration>,
) -> Result<(StatusCode, ApiJson<User>), ApiError> {
    let user = ctx
        .with_db(move |core, conn| {
            accounts::register_patient(conn, input, core.password_iterations)
                .map_err(ApiError::from)
        })
        .await?;
    Ok((StatusCode::CREATED, ApiJson(user)))
}

/// `POST /api/auth/login`: verify credentials and issue a token.
pub async fn login(
    State(ctx): State<ApiContext>,
    ApiJson(input): ApiJson<LoginRequest>,
) -> Result<ApiJson<LoginResponse>, ApiError> {
    let login = ctx
        .with_db(move |core, conn| {
            accounts::authenticate(
                conn,
                &core.tokens,
                &input.email,
                &input.password,
                core.password_iterations,
            )
            .map_err(ApiError::from)
        })
        .await?;

    let user = login.user;
    Ok(ApiJson(LoginResponse {
        token: login.token,
        role: user.role,
        id: user.id,
        name: user.name,
        username: user.username,
    }))
}
