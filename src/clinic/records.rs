//! Medical records, written by doctors and read by their patients.

use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use super::booking::parse_date;
use super::{non_empty, parse_id, require_text, ClinicError};
use crate::db::{self, timestamp_now};
use crate::models::{Doctor, MedicalRecord, MedicalRecordDetail, Role, User};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub visit_date: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub prescription: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<String>,
}

/// Record a visit, authored by `doctor`, for an existing patient.
pub fn add_medical_record(
    conn: &Connection,
    doctor: &Doctor,
    input: NewRecord,
) -> Result<MedicalRecordDetail, ClinicError> {
    let patient_id = parse_id(&input.patient_id, "Patient not found")?;
    let visit_date = parse_date(&input.visit_date, "visitDate")?;
    let diagnosis = require_text(&input.diagnosis, "diagnosis")?;
    let follow_up_date = non_empty(input.follow_up_date)
        .map(|raw| parse_date(&raw, "followUpDate"))
        .transpose()?;
    if let Some(follow_up) = follow_up_date {
        if follow_up < visit_date {
            return Err(ClinicError::InvalidRequest(
                "followUpDate cannot be before visitDate".into(),
            ));
        }
    }

    db::get_user(conn, &patient_id)?
        .filter(|u| u.role == Role::Patient)
        .ok_or_else(|| ClinicError::NotFound("Patient not found".into()))?;

    let now = timestamp_now();
    let record = MedicalRecord {
        id: Uuid::new_v4(),
        patient_id,
        doctor_id: doctor.id,
        visit_date,
        diagnosis,
        prescription: non_empty(input.prescription).unwrap_or_default(),
        follow_up_date,
        created_at: now,
        updated_at: now,
    };
    db::insert_medical_record(conn, &record)?;
    tracing::info!(
        record_id = %record.id,
        doctor_id = %doctor.id,
        patient_id = %patient_id,
        "Medical record added"
    );

    db::get_medical_record_detail(conn, &record.id)?
        .ok_or_else(|| ClinicError::NotFound("Medical record not found".into()))
}

/// The caller's own records, most recent visit first.
pub fn patient_records(
    conn: &Connection,
    patient: &User,
) -> Result<Vec<MedicalRecordDetail>, ClinicError> {
    Ok(db::list_records_for_patient(conn, &patient.id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinic::testing::{self, TestDb};

    fn new_record(patient: &User, visit: &str, diagnosis: &str) -> NewRecord {
        NewRecord {
            patient_id: patient.id.to_string(),
            visit_date: visit.into(),
            diagnosis: diagnosis.into(),
            prescription: Some("Ibuprofen 200mg".into()),
            follow_up_date: None,
        }
    }

    #[test]
    fn record_is_enriched_with_names() {
        let mut db = TestDb::new();
        let patient = testing::patient(&mut db.conn, "pat");
        let (_, doctor) = testing::doctor(&mut db.conn, "doc@x.com", "Dr Doc");

        let mut input = new_record(&patient, "2024-05-01", "Migraine");
        input.follow_up_date = Some("2024-05-15".into());
        let saved = add_medical_record(&db.conn, &doctor, input).unwrap();

        assert_eq!(saved.record.doctor_id, doctor.id);
        assert_eq!(saved.record.prescription, "Ibuprofen 200mg");
        assert_eq!(saved.record.created_at, saved.record.updated_at);
        assert_eq!(saved.patient.name, patient.name);
        assert_eq!(saved.doctor.specialization, "General Practice");

        let json = serde_json::to_value(&saved).unwrap();
        assert_eq!(json["visitDate"], "2024-05-01");
        assert_eq!(json["followUpDate"], "2024-05-15");
    }

    #[test]
    fn record_requires_existing_patient() {
        let mut db = TestDb::new();
        let (doc_user, doctor) = testing::doctor(&mut db.conn, "doc@x.com", "Dr Doc");

        let mut input = new_record(&doc_user, "2024-05-01", "Flu");
        assert!(matches!(
            add_medical_record(&db.conn, &doctor, input.clone()),
            Err(ClinicError::NotFound(m)) if m == "Patient not found"
        ));
        input.patient_id = Uuid::new_v4().to_string();
        assert!(matches!(
            add_medical_record(&db.conn, &doctor, input),
            Err(ClinicError::NotFound(_))
        ));
    }

    #[test]
    fn record_validation() {
        let mut db = TestDb::new();
        let patient = testing::patient(&mut db.conn, "pat");
        let (_, doctor) = testing::doctor(&mut db.conn, "doc@x.com", "Dr Doc");

        let blank = new_record(&patient, "2024-05-01", "   ");
        assert!(matches!(
            add_medical_record(&db.conn, &doctor, blank),
            Err(ClinicError::InvalidRequest(_))
        ));

        let mut backwards = new_record(&patient, "2024-05-01", "Flu");
        backwards.follow_up_date = Some("2024-04-01".into());
        assert!(matches!(
            add_medical_record(&db.conn, &doctor, backwards),
            Err(ClinicError::InvalidRequest(m)) if m.contains("followUpDate")
        ));

        let mut empty_follow_up = new_record(&patient, "2024-05-01", "Flu");
        empty_follow_up.follow_up_date = Some("".into());
        let saved = add_medical_record(&db.conn, &doctor, empty_follow_up).unwrap();
        assert!(saved.record.follow_up_date.is_none());
    }

    #[test]
    fn patients_see_only_their_records_newest_visit_first() {
        let mut db = TestDb::new();
        let pat = testing::patient(&mut db.conn, "pat");
        let other = testing::patient(&mut db.conn, "other");
        let (_, doctor) = testing::doctor(&mut db.conn, "doc@x.com", "Dr Doc");
        add_medical_record(&db.conn, &doctor, new_record(&pat, "2024-01-10", "Flu")).unwrap();
        add_medical_record(&db.conn, &doctor, new_record(&pat, "2024-03-02", "Sprain")).unwrap();
        add_medical_record(&db.conn, &doctor, new_record(&other, "2024-02-01", "Cold")).unwrap();

        let diagnoses: Vec<String> = patient_records(&db.conn, &pat)
            .unwrap()
            .into_iter()
            .map(|r| r.record.diagnosis)
            .collect();
        assert_eq!(diagnoses, vec!["Sprain", "Flu"]);
    }
}
