//! Doctor endpoints. All routes sit behind `require_auth` + `require_doctor`.
//!
//! The caller's doctor profile is resolved per request; appointments and
//! records are keyed by that profile id, not the login id.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Extension;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, AuthUser};
use crate::clinic::booking::{self, StatusChange};
use crate::clinic::profiles::{self, DoctorProfileUpdate};
use crate::clinic::records::{self, NewRecord};
use crate::models::{AppointmentDetail, Doctor, MedicalRecordDetail, User};

pub async fn profile(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<ApiJson<Doctor>, ApiError> {
    let doctor = ctx
        .with_db(move |_, conn| profiles::doctor_for_user(conn, &user).map_err(ApiError::from))
        .await?;
    Ok(ApiJson(doctor))
}

pub async fn update_profile(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(update): ApiJson<DoctorProfileUpdate>,
) -> Result<ApiJson<Doctor>, ApiError> {
    let doctor = ctx
        .with_db(move |_, conn| {
            profiles::update_doctor_profile(conn, &user, update).map_err(ApiError::from)
        })
        .await?;
    Ok(ApiJson(doctor))
}

pub async fn appointments(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<ApiJson<Vec<AppointmentDetail>>, ApiError> {
    let appointments = ctx
        .with_db(move |_, conn| {
            let doctor = profiles::doctor_for_user(conn, &user)?;
            Ok(booking::doctor_appointments(conn, &doctor)?)
        })
        .await?;
    Ok(ApiJson(appointments))
}

/// `PUT /api/doctor/appointments/:id/status`: owner-only status change.
pub async fn set_status(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(appointment_id): Path<String>,
    ApiJson(change): ApiJson<StatusChange>,
) -> Result<ApiJson<AppointmentDetail>, ApiError> {
    let appointment = ctx
        .with_db(move |_, conn| {
            let doctor = profiles::doctor_for_user(conn, &user)?;
            Ok(booking::set_status(conn, &doctor, &appointment_id, &change.status)?)
        })
        .await?;
    Ok(ApiJson(appointment))
}

pub async fn patient(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<ApiJson<User>, ApiError> {
    let patient = ctx
        .with_db(move |_, conn| {
            profiles::patient_details(conn, &patient_id).map_err(ApiError::from)
        })
        .await?;
    Ok(ApiJson(patient))
}

/// `POST /api/doctor/records`: 201 with the new record.
pub async fn add_record(
    State(ctx): State<ApiContext>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(input): ApiJson<NewRecord>,
) -> Result<(StatusCode, ApiJson<MedicalRecordDetail>), ApiError> {
    let record = ctx
        .with_db(move |_, conn| {
            let doctor = profiles::doctor_for_user(conn, &user)?;
            Ok(records::add_medical_record(conn, &doctor, input)?)
        })
        .await?;
    Ok((StatusCode::CREATED, ApiJson(record)))
}
