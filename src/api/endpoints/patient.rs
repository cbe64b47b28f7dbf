//! Patient endpoints. All routes sit behind `require_auth` + `require_patient`.
//!
//! - `GET|PUT /api/patient/profile`
//! - `GET /api/patient/doctors`
//! - `POST /api/patient/appointments/book`
//! - `GET /api/patient/appointments`
//! - `PUT /api/patient/appointments/:id/cancel`
//! - `GET /api/patient/records`

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Extension;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, AuthUser};
use crate::clinic::booking::{self, BookingRequest};
use crate::clinic::profiles::{self, PatientProfileUpdate};
use crate::clinic::records;
use crate::models::{AppointmentDetail, Doctor, MedicalRecordDetail, User};

pub async fn profile(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<ApiJson<User>, ApiError> {
    let profile = ctx
        .with_db(move |_, conn| profiles::patient_profile(conn, &user).map_err(ApiError::from))
        .await?;
    Ok(ApiJson(profile))
}

pub async fn update_profile(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(update): ApiJson<PatientProfileUpdate>,
) -> Result<ApiJson<User>, ApiError> {
    let profile = ctx
        .with_db(move |_, conn| {
            profiles::update_patient_profile(conn, &user, update).map_err(ApiError::from)
        })
        .await?;
    Ok(ApiJson(profile))
}

pub async fn doctors(State(ctx): State<ApiContext>) -> Result<ApiJson<Vec<Doctor>>, ApiError> {
    let doctors = ctx
        .with_db(|_, conn| profiles::list_doctors(conn).map_err(ApiError::from))
        .await?;
    Ok(ApiJson(doctors))
}

/// `POST /api/patient/appointments/book`: 201 with the booked appointment.
pub async fn book(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(request): ApiJson<BookingRequest>,
) -> Result<(StatusCode, ApiJson<AppointmentDetail>), ApiError> {
    let appointment = ctx
        .with_db(move |_, conn| booking::book(conn, &user, request).map_err(ApiError::from))
        .await?;
    Ok((StatusCode::CREATED, ApiJson(appointment)))
}

pub async fn appointments(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<ApiJson<Vec<AppointmentDetail>>, ApiError> {
    let appointments = ctx
        .with_db(move |_, conn| {
            booking::patient_appointments(conn, &user).map_err(ApiError::from)
        })
        .await?;
    Ok(ApiJson(appointments))
}

pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(appointment_id): Path<String>,
) -> Result<ApiJson<AppointmentDetail>, ApiError> {
    let appointment = ctx
        .with_db(move |_, conn| {
            booking::cancel(conn, &user, &appointment_id).map_err(ApiError::from)
        })
        .await?;
    Ok(ApiJson(appointment))
}

pub async fn records(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<ApiJson<Vec<MedicalRecordDetail>>, ApiError> {
    let records = ctx
        .with_db(move |_, conn| records::patient_records(conn, &user).map_err(ApiError::from))
        .await?;
    Ok(ApiJson(records))
}
