//! Admin endpoints. All routes sit behind `require_auth` + `require_admin`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, AuthUser};
use crate::clinic::accounts::{self, CascadeSummary, CreatedDoctor, NewDoctor};
use crate::clinic::booking;
use crate::clinic::reports::{self, Report};
use crate::db;
use crate::models::{AppointmentDetail, User};

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub removed: CascadeSummary,
}

/// `GET /api/admin/users`: newest first, password hashes never serialized.
pub async fn users(State(ctx): State<ApiContext>) -> Result<ApiJson<Vec<User>>, ApiError> {
    let users = ctx
        .with_db(|_, conn| db::list_users(conn).map_err(ApiError::from))
        .await?;
    Ok(ApiJson(users))
}

/// `POST /api/admin/doctors`: 201 with `{user, doctor}`.
pub async fn add_doctor(
    State(ctx): State<ApiContext>,
    ApiJson(input): ApiJson<NewDoctor>,
) -> Result<(StatusCode, ApiJson<CreatedDoctor>), ApiError> {
    let created = ctx
        .with_db(move |core, conn| {
            accounts::add_doctor(
                conn,
                input,
                &core.default_doctor_password,
                core.password_iterations,
            )
            .map_err(ApiError::from)
        })
        .await?;
    Ok((StatusCode::CREATED, ApiJson(created)))
}

/// `DELETE /api/admin/users/:id`: cascading delete in one transaction.
pub async fn delete_user(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<ApiJson<DeleteResponse>, ApiError> {
    let removed = ctx
        .with_db(move |_, conn| {
            accounts::delete_user(conn, &user_id, &admin).map_err(ApiError::from)
        })
        .await?;
    Ok(ApiJson(DeleteResponse {
        message: "User deleted successfully",
        removed,
    }))
}

pub async fn appointments(
    State(ctx): State<ApiContext>,
) -> Result<ApiJson<Vec<AppointmentDetail>>, ApiError> {
    let appointments = ctx
        .with_db(|_, conn| booking::all_appointments(conn).map_err(ApiError::from))
        .await?;
    Ok(ApiJson(appointments))
}

pub async fn reports(State(ctx): State<ApiContext>) -> Result<ApiJson<Report>, ApiError> {
    let report = ctx
        .with_db(|_, conn| reports::build_report(conn).map_err(ApiError::from))
        .await?;
    Ok(ApiJson(report))
}
