//! Patient and doctor profiles.
//!
//! Updates are partial: an absent or blank field keeps its stored value.

use rusqlite::Connection;
use serde::Deserialize;

use super::accounts::schedule_list_opt;
use super::{non_empty, parse_id, ClinicError};
use crate::db;
use crate::models::{Doctor, Role, User};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "schedule_list_opt")]
    pub available_schedule: Option<Vec<String>>,
}

/// The caller's own patient record, re-read from storage.
pub fn patient_profile(conn: &Connection, user: &User) -> Result<User, ClinicError> {
    db::get_user(conn, &user.id)?
        .filter(|u| u.role == Role::Patient)
        .ok_or_else(|| ClinicError::NotFound("Patient not found".into()))
}

pub fn update_patient_profile(
    conn: &Connection,
    user: &User,
    update: PatientProfileUpdate,
) -> Result<User, ClinicError> {
    let mut patient = patient_profile(conn, user)?;
    if let Some(name) = non_empty(update.name) {
        patient.name = name;
    }
    if let Some(gender) = non_empty(update.gender) {
        patient.gender = Some(gender);
    }
    if let Some(phone) = non_empty(update.phone) {
        patient.phone = Some(phone);
    }
    if let Some(address) = non_empty(update.address) {
        patient.address = Some(address);
    }
    if let Some(contact) = non_empty(update.emergency_contact) {
        patient.emergency_contact = Some(contact);
    }
    db::update_user_profile(conn, &patient)?;
    tracing::info!(user_id = %patient.id, "Patient profile updated");
    Ok(patient)
}

/// Doctor profile paired with a doctor login. A doctor account without one
/// is a data gap, reported as not found.
pub fn doctor_for_user(conn: &Connection, user: &User) -> Result<Doctor, ClinicError> {
    db::get_doctor_by_user_id(conn, &user.id)?
        .ok_or_else(|| ClinicError::NotFound("Doctor record not found".into()))
}

pub fn update_doctor_profile(
    conn: &Connection,
    user: &User,
    update: DoctorProfileUpdate,
) -> Result<Doctor, ClinicError> {
    let mut doctor = doctor_for_user(conn, user)?;
    if let Some(name) = non_empty(update.name) {
        doctor.name = name;
    }
    if let Some(specialization) = non_empty(update.specialization) {
        doctor.specialization = specialization;
    }
    if let Some(phone) = non_empty(update.phone) {
        doctor.phone = Some(phone);
    }
    if let Some(schedule) = update.available_schedule.filter(|s| !s.is_empty()) {
        doctor.available_schedule = schedule;
    }
    db::update_doctor(conn, &doctor)?;
    tracing::info!(user_id = %user.id, doctor_id = %doctor.id, "Doctor profile updated");
    Ok(doctor)
}

/// A patient's record as seen by a doctor.
pub fn patient_details(conn: &Connection, patient_id: &str) -> Result<User, ClinicError> {
    let id = parse_id(patient_id, "Patient not found")?;
    db::get_user(conn, &id)?
        .filter(|u| u.role == Role::Patient)
        .ok_or_else(|| ClinicError::NotFound("Patient not found".into()))
}

/// All doctor profiles, by name.
pub fn list_doctors(conn: &Connection) -> Result<Vec<Doctor>, ClinicError> {
    Ok(db::list_doctors(conn)?)
}
