use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use uuid::Uuid;

use super::{date_col, enum_col, format_timestamp, timestamp_col, uuid_col};
use crate::db::DatabaseError;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str =
    "id, patient_id, doctor_id, date, time, notes, status, created_at";

/// Appointment joined with the doctor profile and the patient identity.
const APPOINTMENT_DETAIL_SELECT: &str =
    "SELECT a.id, a.patient_id, a.doctor_id, a.date, a.time, a.notes, a.status, a.created_at,
            d.name, d.specialization, p.name, p.email, p.phone
     FROM appointments a
     JOIN doctors d ON d.id = a.doctor_id
     JOIN users p ON p.id = a.patient_id";

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, doctor_id, date, time, notes, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.doctor_id.to_string(),
            appt.date.to_string(),
            appt.time,
            appt.notes,
            appt.status.as_str(),
            format_timestamp(&appt.created_at),
        ],
    )?;
    Ok(())
}

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: uuid_col(row, 0)?,
        patient_id: uuid_col(row, 1)?,
        doctor_id: uuid_col(row, 2)?,
        date: date_col(row, 3)?,
        time: row.get(4)?,
        notes: row.get(5)?,
        status: enum_col(row, 6)?,
        created_at: timestamp_col(row, 7)?,
    })
}

fn detail_from_row(row: &Row<'_>) -> rusqlite::Result<AppointmentDetail> {
    let appointment = appointment_from_row(row)?;
    Ok(AppointmentDetail {
        doctor: DoctorSummary {
            id: appointment.doctor_id,
            name: row.get(8)?,
            specialization: row.get(9)?,
        },
        patient: PatientSummary {
            id: appointment.patient_id,
            name: row.get(10)?,
            email: row.get(11)?,
            phone: row.get(12)?,
        },
        appointment,
    })
}

fn query_details<P: Params>(
    conn: &Connection,
    clause: &str,
    params: P,
) -> Result<Vec<AppointmentDetail>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{APPOINTMENT_DETAIL_SELECT} {clause}"))?;
    let rows = stmt.query_map(params, detail_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let appt = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id.to_string()],
            appointment_from_row,
        )
        .optional()?;
    Ok(appt)
}

pub fn get_appointment_detail(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<AppointmentDetail>, DatabaseError> {
    let mut details = query_details(conn, "WHERE a.id = ?1", params![id.to_string()])?;
    Ok(details.pop())
}

/// The id of the active booking occupying a slot, if any.
pub fn find_booked_in_slot(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
    time: &str,
) -> Result<Option<Uuid>, DatabaseError> {
    let id: Option<String> = conn
        .query_row(
            "SELECT id FROM appointments
             WHERE doctor_id = ?1 AND date = ?2 AND time = ?3 AND status = ?4
             LIMIT 1",
            params![
                doctor_id.to_string(),
                date.to_string(),
                time,
                AppointmentStatus::Booked.as_str(),
            ],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id.and_then(|s| Uuid::parse_str(&s).ok()))
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET status = ?2 WHERE id = ?1",
        params![id.to_string(), status.as_str()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// A patient's appointments in calendar order.
pub fn list_appointments_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<AppointmentDetail>, DatabaseError> {
    query_details(
        conn,
        "WHERE a.patient_id = ?1 ORDER BY a.date ASC, a.time ASC",
        params![patient_id.to_string()],
    )
}

/// A doctor's appointments in calendar order.
pub fn list_appointments_for_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<AppointmentDetail>, DatabaseError> {
    query_details(
        conn,
        "WHERE a.doctor_id = ?1 ORDER BY a.date ASC, a.time ASC",
        params![doctor_id.to_string()],
    )
}

/// Every appointment, latest slot first.
pub fn list_all_appointments(conn: &Connection) -> Result<Vec<AppointmentDetail>, DatabaseError> {
    query_details(conn, "ORDER BY a.date DESC, a.time DESC", params![])
}

/// Most recently created appointments.
pub fn list_recent_appointments(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<AppointmentDetail>, DatabaseError> {
    query_details(conn, "ORDER BY a.created_at DESC LIMIT ?1", params![limit])
}

/// Remove appointments where the patient took part, or that were held with the doctor profile.
pub fn delete_appointments_for(
    conn: &Connection,
    patient_id: &Uuid,
    doctor_id: Option<&Uuid>,
) -> Result<usize, DatabaseError> {
    let removed = conn.execute(
        "DELETE FROM appointments WHERE patient_id = ?1 OR doctor_id = ?2",
        params![patient_id.to_string(), doctor_id.map(|id| id.to_string())],
    )?;
    Ok(removed)
}

pub fn count_appointments(conn: &Connection) -> Result<u64, DatabaseError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?;
    Ok(count as u64)
}

/// Appointment counts per status. Statuses with no appointments are absent.
pub fn count_appointments_by_status(
    conn: &Connection,
) -> Result<Vec<(AppointmentStatus, u64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM appointments GROUP BY status ORDER BY status ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((enum_col::<AppointmentStatus>(row, 0)?, row.get::<_, i64>(1)? as u64))
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Appointment counts per doctor display name, busiest first.
pub fn count_appointments_by_doctor(conn: &Connection) -> Result<Vec<(String, u64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT d.name, COUNT(*) AS total
         FROM appointments a
         JOIN doctors d ON d.id = a.doctor_id
         GROUP BY d.name
         ORDER BY total DESC, d.name ASC",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
