//! Appointment booking and status changes.
//!
//! At most one appointment per (doctor, date, time) may be `booked`. The
//! check and insert share an IMMEDIATE transaction, and the partial unique
//! index on `appointments` rejects anything that slips past it.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use uuid::Uuid;

use super::{non_empty, parse_id, require_text, ClinicError};
use crate::db::{self, timestamp_now, DatabaseError};
use crate::models::{Appointment, AppointmentDetail, AppointmentStatus, Doctor, User};

const SLOT_TAKEN: &str = "This time slot is already booked";
const APPOINTMENT_NOT_FOUND: &str = "Appointment not found";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default)]
    pub doctor_id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    #[serde(default)]
    pub status: String,
}

/// Calendar date from `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp.
pub fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, ClinicError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|ts| ts.date_naive()))
        .map_err(|_| ClinicError::InvalidRequest(format!("{field} must be a date (YYYY-MM-DD)")))
}

fn slot_conflict(err: DatabaseError) -> ClinicError {
    if err.is_constraint_violation() {
        ClinicError::Conflict(SLOT_TAKEN.into())
    } else {
        ClinicError::Database(err)
    }
}

fn detail(conn: &Connection, id: &Uuid) -> Result<AppointmentDetail, ClinicError> {
    db::get_appointment_detail(conn, id)?
        .ok_or_else(|| ClinicError::NotFound(APPOINTMENT_NOT_FOUND.into()))
}

pub fn book(
    conn: &mut Connection,
    patient: &User,
    request: BookingRequest,
) -> Result<AppointmentDetail, ClinicError> {
    let doctor_id = parse_id(&request.doctor_id, "Doctor not found")?;
    let date = parse_date(&request.date, "date")?;
    let time = require_text(&request.time, "time")?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if db::get_doctor(&tx, &doctor_id)?.is_none() {
        return Err(ClinicError::NotFound("Doctor not found".into()));
    }
    if let Some(existing) = db::find_booked_in_slot(&tx, &doctor_id, date, &time)? {
        tracing::info!(
            patient_id = %patient.id,
            doctor_id = %doctor_id,
            existing = %existing,
            %date,
            time = %time,
            "Booking rejected: slot taken"
        );
        return Err(ClinicError::Conflict(SLOT_TAKEN.into()));
    }

    let appointment = Appointment {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        doctor_id,
        date,
        time,
        notes: non_empty(request.notes).unwrap_or_default(),
        status: AppointmentStatus::Booked,
        created_at: timestamp_now(),
    };
    db::insert_appointment(&tx, &appointment).map_err(slot_conflict)?;
    let booked = detail(&tx, &appointment.id)?;
    tx.commit()?;

    tracing::info!(
        appointment_id = %appointment.id,
        patient_id = %patient.id,
        doctor_id = %doctor_id,
        %date,
        time = %appointment.time,
        "Appointment booked"
    );
    Ok(booked)
}

/// Patient-side cancel. Someone else's appointment reads as missing.
pub fn cancel(
    conn: &Connection,
    patient: &User,
    appointment_id: &str,
) -> Result<AppointmentDetail, ClinicError> {
    let id = parse_id(appointment_id, APPOINTMENT_NOT_FOUND)?;
    let appointment = db::get_appointment(conn, &id)?
        .filter(|a| a.patient_id == patient.id)
        .ok_or_else(|| ClinicError::NotFound(APPOINTMENT_NOT_FOUND.into()))?;

    match appointment.status {
        AppointmentStatus::Completed => {
            return Err(ClinicError::InvalidTransition(
                "Cannot cancel a completed appointment".into(),
            ))
        }
        AppointmentStatus::Canceled => {}
        AppointmentStatus::Booked => {
            db::update_appointment_status(conn, &id, AppointmentStatus::Canceled)?;
            tracing::info!(appointment_id = %id, patient_id = %patient.id, "Appointment canceled");
        }
    }
    detail(conn, &id)
}

/// Doctor-side status change. Any known status may be set; only the
/// appointment's own doctor may set it.
pub fn set_status(
    conn: &Connection,
    doctor: &Doctor,
    appointment_id: &str,
    requested: &str,
) -> Result<AppointmentDetail, ClinicError> {
    let id = parse_id(appointment_id, APPOINTMENT_NOT_FOUND)?;
    let appointment = db::get_appointment(conn, &id)?
        .ok_or_else(|| ClinicError::NotFound(APPOINTMENT_NOT_FOUND.into()))?;
    if appointment.doctor_id != doctor.id {
        return Err(ClinicError::Forbidden(
            "Access denied. This is not your appointment.".into(),
        ));
    }

    let status = AppointmentStatus::from_str(requested.trim()).map_err(|_| {
        tracing::warn!(
            appointment_id = %id,
            doctor_id = %doctor.id,
            requested,
            "Rejected unknown appointment status"
        );
        ClinicError::InvalidRequest(format!(
            "Invalid status {requested:?}; expected one of booked, completed, canceled"
        ))
    })?;

    if status != appointment.status {
        // Re-booking a slot someone else now holds trips the unique index.
        db::update_appointment_status(conn, &id, status).map_err(slot_conflict)?;
        tracing::info!(
            appointment_id = %id,
            doctor_id = %doctor.id,
            from = %appointment.status,
            to = %status,
            "Appointment status changed"
        );
    }
    detail(conn, &id)
}

pub fn patient_appointments(
    conn: &Connection,
    patient: &User,
) -> Result<Vec<AppointmentDetail>, ClinicError> {
    Ok(db::list_appointments_for_patient(conn, &patient.id)?)
}

pub fn doctor_appointments(
    conn: &Connection,
    doctor: &Doctor,
) -> Result<Vec<AppointmentDetail>, ClinicError> {
    Ok(db::list_appointments_for_doctor(conn, &doctor.id)?)
}

pub fn all_appointments(conn: &Connection) -> Result<Vec<AppointmentDetail>, ClinicError> {
    Ok(db::list_all_appointments(conn)?)
}
