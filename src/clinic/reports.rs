//! Admin dashboard aggregates, computed fresh on every call.

use rusqlite::Connection;
use serde::Serialize;

use super::ClinicError;
use crate::db;
use crate::models::{AppointmentDetail, AppointmentStatus, Role};

pub const RECENT_APPOINTMENTS: u32 = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub patients: u64,
    pub doctors: u64,
    pub appointments: u64,
    pub records: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: AppointmentStatus,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorCount {
    pub doctor: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub totals: Totals,
    pub appointments_by_status: Vec<StatusCount>,
    pub appointments_by_doctor: Vec<DoctorCount>,
    pub recent_appointments: Vec<AppointmentDetail>,
}

pub fn build_report(conn: &Connection) -> Result<Report, ClinicError> {
    let totals = Totals {
        patients: db::count_users_by_role(conn, Role::Patient)?,
        doctors: db::count_users_by_role(conn, Role::Doctor)?,
        appointments: db::count_appointments(conn)?,
        records: db::count_records(conn)?,
    };
    let appointments_by_status = db::count_appointments_by_status(conn)?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();
    let appointments_by_doctor = db::count_appointments_by_doctor(conn)?
        .into_iter()
        .map(|(doctor, count)| DoctorCount { doctor, count })
        .collect();

    Ok(Report {
        totals,
        appointments_by_status,
        appointments_by_doctor,
        recent_appointments: db::list_recent_appointments(conn, RECENT_APPOINTMENTS)?,
    })
}
