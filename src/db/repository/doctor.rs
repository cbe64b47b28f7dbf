use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite::types::Type;
use uuid::Uuid;

use super::{format_timestamp, timestamp_col, uuid_col};
use crate::db::DatabaseError;
use crate::models::*;

const DOCTOR_COLUMNS: &str =
    "id, user_id, name, specialization, email, phone, available_schedule, created_at";

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, user_id, name, specialization, email, phone, available_schedule, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            doctor.id.to_string(),
            doctor.user_id.to_string(),
            doctor.name,
            doctor.specialization,
            doctor.email,
            doctor.phone,
            serde_json::to_string(&doctor.available_schedule)?,
            format_timestamp(&doctor.created_at),
        ],
    )?;
    Ok(())
}

fn doctor_from_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    let schedule: String = row.get(6)?;
    let available_schedule = serde_json::from_str(&schedule)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
    Ok(Doctor {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        name: row.get(2)?,
        specialization: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        available_schedule,
        created_at: timestamp_col(row, 7)?,
    })
}

pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<Option<Doctor>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1"),
            params![id.to_string()],
            doctor_from_row,
        )
        .optional()?;
    Ok(doctor)
}

/// The clinical profile paired with a login identity.
pub fn get_doctor_by_user_id(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Option<Doctor>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE user_id = ?1"),
            params![user_id.to_string()],
            doctor_from_row,
        )
        .optional()?;
    Ok(doctor)
}

pub fn list_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors ORDER BY name ASC"
    ))?;
    let rows = stmt.query_map([], doctor_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE doctors SET name = ?2, specialization = ?3, phone = ?4, available_schedule = ?5
         WHERE id = ?1",
        params![
            doctor.id.to_string(),
            doctor.name,
            doctor.specialization,
            doctor.phone,
            serde_json::to_string(&doctor.available_schedule)?,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "doctor".into(),
            id: doctor.id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_doctor_by_user_id(conn: &Connection, user_id: &Uuid) -> Result<usize, DatabaseError> {
    let removed = conn.execute(
        "DELETE FROM doctors WHERE user_id = ?1",
        params![user_id.to_string()],
    )?;
    Ok(removed)
}
