use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{date_col, format_timestamp, opt_date_col, timestamp_col, uuid_col};
use crate::db::DatabaseError;
use crate::models::*;

const RECORD_DETAIL_SELECT: &str =
    "SELECT r.id, r.patient_id, r.doctor_id, r.visit_date, r.diagnosis, r.prescription,
            r.follow_up_date, r.created_at, r.updated_at,
            d.name, d.specialization, p.name, p.email, p.phone
     FROM medical_records r
     JOIN doctors d ON d.id = r.doctor_id
     JOIN users p ON p.id = r.patient_id";

pub fn insert_medical_record(conn: &Connection, record: &MedicalRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medical_records (id, patient_id, doctor_id, visit_date, diagnosis, prescription,
         follow_up_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            record.id.to_string(),
            record.patient_id.to_string(),
            record.doctor_id.to_string(),
            record.visit_date.to_string(),
            record.diagnosis,
            record.prescription,
            record.follow_up_date.map(|d| d.to_string()),
            format_timestamp(&record.created_at),
            format_timestamp(&record.updated_at),
        ],
    )?;
    Ok(())
}

fn detail_from_row(row: &Row<'_>) -> rusqlite::Result<MedicalRecordDetail> {
    let record = MedicalRecord {
        id: uuid_col(row, 0)?,
        patient_id: uuid_col(row, 1)?,
        doctor_id: uuid_col(row, 2)?,
        visit_date: date_col(row, 3)?,
        diagnosis: row.get(4)?,
        prescription: row.get(5)?,
        follow_up_date: opt_date_col(row, 6)?,
        created_at: timestamp_col(row, 7)?,
        updated_at: timestamp_col(row, 8)?,
    };
    Ok(MedicalRecordDetail {
        doctor: DoctorSummary {
            id: record.doctor_id,
            name: row.get(9)?,
            specialization: row.get(10)?,
        },
        patient: PatientSummary {
            id: record.patient_id,
            name: row.get(11)?,
            email: row.get(12)?,
            phone: row.get(13)?,
        },
        record,
    })
}

pub fn get_medical_record_detail(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<MedicalRecordDetail>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{RECORD_DETAIL_SELECT} WHERE r.id = ?1"))?;
    let mut rows = stmt.query_map(params![id.to_string()], detail_from_row)?;
    rows.next().transpose().map_err(DatabaseError::from)
}

/// A patient's records, most recent visit first.
pub fn list_records_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<MedicalRecordDetail>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{RECORD_DETAIL_SELECT} WHERE r.patient_id = ?1
         ORDER BY r.visit_date DESC, r.created_at DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], detail_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Remove records about the patient, or written by the doctor profile.
pub fn delete_records_for(
    conn: &Connection,
    patient_id: &Uuid,
    doctor_id: Option<&Uuid>,
) -> Result<usize, DatabaseError> {
    let removed = conn.execute(
        "DELETE FROM medical_records WHERE patient_id = ?1 OR doctor_id = ?2",
        params![patient_id.to_string(), doctor_id.map(|id| id.to_string())],
    )?;
    Ok(removed)
}

pub fn count_records(conn: &Connection) -> Result<u64, DatabaseError> {
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM medical_records", [], |row| row.get(0))?;
    Ok(count as u64)
}
