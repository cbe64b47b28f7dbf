//! Account lifecycle: registration, login, token resolution, admin-created
//! doctors, bootstrap admin and the cascading user delete.

use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::{non_empty, require_text, ClinicError};
use crate::crypto::{decoy_hash, hash_password, verify_password, CryptoError, TokenService};
use crate::db::{self, timestamp_now};
use crate::models::{Doctor, Role, User};

pub const MIN_PASSWORD_LENGTH: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const DUPLICATE_EMAIL: &str = "User already exists with this email";

/// Self-service sign-up payload. Only patient accounts can be created here.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
}

/// Admin payload for creating a doctor login and profile together.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDoctor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "schedule_list")]
    pub available_schedule: Vec<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedDoctor {
    pub user: User,
    pub doctor: Doctor,
}

#[derive(Debug, Clone)]
pub struct Login {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSummary {
    pub doctor_profiles: usize,
    pub appointments: usize,
    pub records: usize,
}

/// Schedules arrive either as a list of slot strings or as one
/// comma-separated string.
pub(crate) fn schedule_list_opt<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Schedule {
        List(Vec<String>),
        Text(String),
    }

    let slots = match Option::<Schedule>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Schedule::List(items)) => items,
        Some(Schedule::Text(text)) => text.split(',').map(str::to_string).collect(),
    };
    Ok(Some(
        slots
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    ))
}

fn schedule_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(schedule_list_opt(deserializer)?.unwrap_or_default())
}

pub(crate) fn normalize_email(raw: &str) -> Result<String, ClinicError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(ClinicError::InvalidRequest("A valid email is required".into()));
    }
    Ok(email)
}

fn check_password(password: &str) -> Result<(), ClinicError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ClinicError::InvalidRequest(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn duplicate_to_conflict(err: db::DatabaseError) -> ClinicError {
    if err.is_constraint_violation() {
        ClinicError::Conflict(DUPLICATE_EMAIL.into())
    } else {
        ClinicError::Database(err)
    }
}

pub fn register_patient(
    conn: &Connection,
    input: Registration,
    iterations: u32,
) -> Result<User, ClinicError> {
    match input.role.as_deref().map(str::trim) {
        None | Some("") | Some("patient") => {}
        Some(_) => {
            return Err(ClinicError::InvalidRequest(
                "Only patient accounts can be registered".into(),
            ))
        }
    }

    let username = require_text(&input.username, "username")?;
    let name = require_text(&input.name, "name")?;
    let email = normalize_email(&input.email)?;
    check_password(&input.password)?;

    if db::email_exists(conn, &email)? {
        return Err(ClinicError::Conflict(DUPLICATE_EMAIL.into()));
    }
    if db::username_exists(conn, &username)? {
        return Err(ClinicError::Conflict("Username is already taken".into()));
    }

    let user = User {
        id: Uuid::new_v4(),
        username,
        email,
        password_hash: hash_password(&input.password, iterations),
        role: Role::Patient,
        name,
        gender: non_empty(input.gender),
        phone: non_empty(input.phone),
        address: non_empty(input.address),
        emergency_contact: non_empty(input.emergency_contact),
        created_at: timestamp_now(),
    };
    db::insert_user(conn, &user).map_err(duplicate_to_conflict)?;

    tracing::info!(user_id = %user.id, "Patient registered");
    Ok(user)
}

/// Check credentials and issue a token. Unknown email and wrong password
/// are indistinguishable to the caller: an unknown email still pays for one
/// key derivation at `iterations`.
pub fn authenticate(
    conn: &Connection,
    tokens: &TokenService,
    email: &str,
    password: &str,
    iterations: u32,
) -> Result<Login, ClinicError> {
    let email = email.trim().to_lowercase();
    let Some(user) = db::get_user_by_email(conn, &email)? else {
        let _ = verify_password(password, &decoy_hash(iterations));
        tracing::info!("Login failed: unknown email");
        return Err(ClinicError::Unauthenticated(INVALID_CREDENTIALS.into()));
    };

    match verify_password(password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(user_id = %user.id, "Login failed: wrong password");
            return Err(ClinicError::Unauthenticated(INVALID_CREDENTIALS.into()));
        }
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "Stored password hash unusable");
            return Err(ClinicError::Unauthenticated(INVALID_CREDENTIALS.into()));
        }
    }

    let token = tokens.issue(&user.id)?;
    tracing::info!(user_id = %user.id, role = %user.role, "Login succeeded");
    Ok(Login { token, user })
}

/// Resolve a bearer token to the live user it names. The role comes from
/// storage, never from the token.
pub fn resolve_bearer(
    conn: &Connection,
    tokens: &TokenService,
    token: &str,
) -> Result<User, ClinicError> {
    let user_id = tokens.verify(token).map_err(|e| match e {
        CryptoError::TokenExpired => ClinicError::Unauthenticated("Token expired".into()),
        _ => ClinicError::Unauthenticated("Invalid token".into()),
    })?;
    db::get_user(conn, &user_id)?
        .ok_or_else(|| ClinicError::Unauthenticated("User no longer exists".into()))
}

/// Username derived from the email's local part, suffixed until unique.
fn available_username(conn: &Connection, email: &str) -> Result<String, ClinicError> {
    let base = email.split('@').next().unwrap_or(email).to_string();
    if !db::username_exists(conn, &base)? {
        return Ok(base);
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{base}{n}");
        if !db::username_exists(conn, &candidate)? {
            return Ok(candidate);
        }
        n += 1;
    }
}

pub fn add_doctor(
    conn: &mut Connection,
    input: NewDoctor,
    default_password: &str,
    iterations: u32,
) -> Result<CreatedDoctor, ClinicError> {
    let name = require_text(&input.name, "name")?;
    let specialization = require_text(&input.specialization, "specialization")?;
    let email = normalize_email(&input.email)?;
    let password = non_empty(input.password).unwrap_or_else(|| default_password.to_string());
    check_password(&password)?;
    let password_hash = hash_password(&password, iterations);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if db::email_exists(&tx, &email)? {
        return Err(ClinicError::Conflict(DUPLICATE_EMAIL.into()));
    }

    let now = timestamp_now();
    let user = User {
        id: Uuid::new_v4(),
        username: available_username(&tx, &email)?,
        email: email.clone(),
        password_hash,
        role: Role::Doctor,
        name: name.clone(),
        gender: None,
        phone: non_empty(input.phone.clone()),
        address: None,
        emergency_contact: None,
        created_at: now,
    };
    let doctor = Doctor {
        id: Uuid::new_v4(),
        user_id: user.id,
        name,
        specialization,
        email,
        phone: non_empty(input.phone),
        available_schedule: input.available_schedule,
        created_at: now,
    };
    db::insert_user(&tx, &user).map_err(duplicate_to_conflict)?;
    db::insert_doctor(&tx, &doctor).map_err(duplicate_to_conflict)?;
    tx.commit()?;

    tracing::info!(user_id = %user.id, doctor_id = %doctor.id, "Doctor added");
    Ok(CreatedDoctor { user, doctor })
}

/// Remove a user and everything that references them, atomically.
pub fn delete_user(
    conn: &mut Connection,
    target: &str,
    acting_admin: &User,
) -> Result<CascadeSummary, ClinicError> {
    // Compare parsed ids: the same UUID has several accepted spellings.
    if Uuid::parse_str(target.trim()).is_ok_and(|id| id == acting_admin.id) {
        return Err(ClinicError::InvalidRequest("You cannot delete yourself".into()));
    }
    let target_id = super::parse_id(target, "User not found")?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let user = db::get_user(&tx, &target_id)?
        .ok_or_else(|| ClinicError::NotFound("User not found".into()))?;

    let doctor = if user.role == Role::Doctor {
        db::get_doctor_by_user_id(&tx, &user.id)?
    } else {
        None
    };
    let doctor_id = doctor.as_ref().map(|d| d.id);

    let records = db::delete_records_for(&tx, &user.id, doctor_id.as_ref())?;
    let appointments = db::delete_appointments_for(&tx, &user.id, doctor_id.as_ref())?;
    let doctor_profiles = db::delete_doctor_by_user_id(&tx, &user.id)?;
    db::delete_user(&tx, &user.id)?;
    tx.commit()?;

    let summary = CascadeSummary {
        doctor_profiles,
        appointments,
        records,
    };
    tracing::info!(
        user_id = %user.id,
        admin_id = %acting_admin.id,
        role = %user.role,
        doctor_profiles,
        appointments,
        records,
        "User deleted with dependents"
    );
    Ok(summary)
}

/// Create the bootstrap admin if no account holds the email yet.
/// Returns whether an account was created.
pub fn seed_admin(
    conn: &Connection,
    email: &str,
    password: &str,
    iterations: u32,
) -> Result<bool, ClinicError> {
    let email = normalize_email(email)?;
    if let Some(existing) = db::get_user_by_email(conn, &email)? {
        if existing.role != Role::Admin {
            tracing::warn!(user_id = %existing.id, "Bootstrap admin email belongs to a non-admin account");
        }
        return Ok(false);
    }
    check_password(password)?;

    let user = User {
        id: Uuid::new_v4(),
        username: available_username(conn, &email)?,
        email,
        password_hash: hash_password(password, iterations),
        role: Role::Admin,
        name: "Administrator".into(),
        gender: None,
        phone: None,
        address: None,
        emergency_contact: None,
        created_at: timestamp_now(),
    };
    db::insert_user(conn, &user)?;
    tracing::info!(user_id = %user.id, "Bootstrap admin created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinic::testing::{self, registration, TestDb, TEST_ITERATIONS};
    use crate::crypto::password::derivations;
    use crate::models::AppointmentStatus;
    use chrono::{Duration, NaiveDate};

    fn tokens() -> TokenService {
        TokenService::new(b"accounts-test-secret", Duration::hours(1)).unwrap()
    }

    #[test]
    fn registration_creates_patient_without_exposing_hash() {
        let db = TestDb::new();
        let mut input = registration("alice");
        input.email = "  Alice@Clinic.Test ".into();
        let user = register_patient(&db.conn, input, TEST_ITERATIONS).unwrap();

        assert_eq!(user.role, Role::Patient);
        assert_eq!(user.email, "alice@clinic.test");
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "patient");
    }

    #[test]
    fn duplicate_email_is_rejected_regardless_of_role() {
        let mut db = TestDb::new();
        testing::doctor(&mut db.conn, "taken@clinic.test", "Dr Taken");

        let mut input = registration("newbie");
        input.email = "TAKEN@clinic.test".into();
        let err = register_patient(&db.conn, input, TEST_ITERATIONS).unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(m) if m == DUPLICATE_EMAIL));
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = TestDb::new();
        register_patient(&db.conn, registration("bob"), TEST_ITERATIONS).unwrap();
        let mut again = registration("bob");
        again.email = "bob-other@clinic.test".into();
        assert!(matches!(
            register_patient(&db.conn, again, TEST_ITERATIONS),
            Err(ClinicError::Conflict(_))
        ));
    }

    #[test]
    fn registration_refuses_privileged_roles_and_bad_input() {
        let db = TestDb::new();

        let mut admin = registration("mallory");
        admin.role = Some("admin".into());
        assert!(matches!(
            register_patient(&db.conn, admin, TEST_ITERATIONS),
            Err(ClinicError::InvalidRequest(_))
        ));

        let mut short = registration("shorty");
        short.password = "12345".into();
        assert!(matches!(
            register_patient(&db.conn, short, TEST_ITERATIONS),
            Err(ClinicError::InvalidRequest(m)) if m.contains("at least 6")
        ));

        let mut bad_email = registration("nomail");
        bad_email.email = "not-an-email".into();
        assert!(matches!(
            register_patient(&db.conn, bad_email, TEST_ITERATIONS),
            Err(ClinicError::InvalidRequest(_))
        ));

        let mut explicit = registration("explicit");
        explicit.role = Some("patient".into());
        assert!(register_patient(&db.conn, explicit, TEST_ITERATIONS).is_ok());
    }

    #[test]
    fn login_issues_token_that_resolves_to_user() {
        let db = TestDb::new();
        let user = register_patient(&db.conn, registration("carol"), TEST_ITERATIONS).unwrap();
        let tokens = tokens();

        let login = authenticate(&db.conn, &tokens, "CAROL@clinic.test", "password1", TEST_ITERATIONS)
            .unwrap();
        assert_eq!(login.user.id, user.id);
        let resolved = resolve_bearer(&db.conn, &tokens, &login.token).unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[test]
    fn login_failures_look_identical() {
        let db = TestDb::new();
        register_patient(&db.conn, registration("dave"), TEST_ITERATIONS).unwrap();
        let tokens = tokens();

        let wrong = authenticate(&db.conn, &tokens, "dave@clinic.test", "nope!!", TEST_ITERATIONS)
            .unwrap_err();
        let unknown =
            authenticate(&db.conn, &tokens, "who@clinic.test", "password1", TEST_ITERATIONS)
                .unwrap_err();
        assert_eq!(wrong.to_string(), INVALID_CREDENTIALS);
        assert_eq!(unknown.to_string(), INVALID_CREDENTIALS);
        assert!(matches!(wrong, ClinicError::Unauthenticated(_)));
    }

    #[test]
    fn unknown_email_costs_the_same_derivation_as_wrong_password() {
        let db = TestDb::new();
        register_patient(&db.conn, registration("dave"), TEST_ITERATIONS).unwrap();
        let tokens = tokens();

        let before = derivations();
        authenticate(&db.conn, &tokens, "dave@clinic.test", "nope!!", TEST_ITERATIONS)
            .unwrap_err();
        let known = derivations() - before;

        let before = derivations();
        authenticate(&db.conn, &tokens, "who@clinic.test", "nope!!", TEST_ITERATIONS)
            .unwrap_err();
        let unknown = derivations() - before;

        assert_eq!(known, 1);
        assert_eq!(unknown, known);
    }

    #[test]
    fn token_for_deleted_user_is_unauthenticated() {
        let mut db = TestDb::new();
        let admin = testing::admin(&mut db.conn, "root@clinic.test");
        let user = testing::patient(&mut db.conn, "erin");
        let tokens = tokens();
        let token = tokens.issue(&user.id).unwrap();

        delete_user(&mut db.conn, &user.id.to_string(), &admin).unwrap();
        let err = resolve_bearer(&db.conn, &tokens, &token).unwrap_err();
        assert!(matches!(err, ClinicError::Unauthenticated(_)));
    }

    #[test]
    fn garbage_token_is_unauthenticated() {
        let db = TestDb::new();
        let err = resolve_bearer(&db.conn, &tokens(), "garbage").unwrap_err();
        assert!(matches!(err, ClinicError::Unauthenticated(m) if m == "Invalid token"));
    }

    #[test]
    fn add_doctor_creates_linked_user_and_profile() {
        let mut db = TestDb::new();
        let (user, doctor) = testing::doctor(&mut db.conn, "jane@x.com", "Dr Jane");

        assert_eq!(user.role, Role::Doctor);
        assert_eq!(user.username, "jane");
        assert_eq!(doctor.user_id, user.id);
        assert_eq!(doctor.email, user.email);
        assert!(verify_password("doctor123", &user.password_hash).unwrap());

        let stored = db::get_doctor_by_user_id(&db.conn, &user.id).unwrap().unwrap();
        assert_eq!(stored.id, doctor.id);
    }

    #[test]
    fn add_doctor_suffixes_taken_username_and_honours_password() {
        let mut db = TestDb::new();
        testing::doctor(&mut db.conn, "jane@x.com", "Dr Jane");
        let created = add_doctor(
            &mut db.conn,
            NewDoctor {
                name: "Dr Jane Two".into(),
                specialization: "Dermatology".into(),
                email: "jane@y.com".into(),
                phone: Some("555-0199".into()),
                available_schedule: vec![],
                password: Some("chosen-pass".into()),
            },
            "doctor123",
            TEST_ITERATIONS,
        )
        .unwrap();
        assert_eq!(created.user.username, "jane2");
        assert!(verify_password("chosen-pass", &created.user.password_hash).unwrap());
    }

    #[test]
    fn add_doctor_with_existing_email_leaves_nothing_behind() {
        let mut db = TestDb::new();
        testing::patient(&mut db.conn, "kim");
        let err = add_doctor(
            &mut db.conn,
            NewDoctor {
                name: "Dr Kim".into(),
                specialization: "ENT".into(),
                email: "kim@clinic.test".into(),
                phone: None,
                available_schedule: vec![],
                password: None,
            },
            "doctor123",
            TEST_ITERATIONS,
        )
        .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
        assert_eq!(db::list_doctors(&db.conn).unwrap().len(), 0);
        assert_eq!(db::count_users_by_role(&db.conn, Role::Doctor).unwrap(), 0);
    }

    #[test]
    fn schedule_accepts_list_or_text() {
        let from_list: NewDoctor = serde_json::from_value(serde_json::json!({
            "name": "A", "specialization": "B", "email": "a@b.c",
            "availableSchedule": ["Mon 9-12", " ", "Tue 1-3"]
        }))
        .unwrap();
        assert_eq!(from_list.available_schedule, vec!["Mon 9-12", "Tue 1-3"]);

        let from_text: NewDoctor = serde_json::from_value(serde_json::json!({
            "name": "A", "specialization": "B", "email": "a@b.c",
            "availableSchedule": "Mon 9-12, Tue 1-3"
        }))
        .unwrap();
        assert_eq!(from_text.available_schedule, vec!["Mon 9-12", "Tue 1-3"]);

        let absent: NewDoctor = serde_json::from_value(serde_json::json!({
            "name": "A", "specialization": "B", "email": "a@b.c"
        }))
        .unwrap();
        assert!(absent.available_schedule.is_empty());
    }

    #[test]
    fn admin_cannot_delete_self() {
        let mut db = TestDb::new();
        let admin = testing::admin(&mut db.conn, "root@clinic.test");
        let err = delete_user(&mut db.conn, &admin.id.to_string(), &admin).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidRequest(m) if m == "You cannot delete yourself"));
        assert!(db::get_user(&db.conn, &admin.id).unwrap().is_some());
    }

    #[test]
    fn admin_cannot_delete_self_through_alternate_id_spellings() {
        let mut db = TestDb::new();
        let admin = testing::admin(&mut db.conn, "root@clinic.test");
        let spellings = [
            admin.id.to_string().to_uppercase(),
            admin.id.simple().to_string(),
            admin.id.braced().to_string(),
            format!("  {}  ", admin.id.urn()),
        ];
        for target in spellings {
            let err = delete_user(&mut db.conn, &target, &admin).unwrap_err();
            assert!(
                matches!(&err, ClinicError::InvalidRequest(m) if m == "You cannot delete yourself"),
                "{target}: {err}"
            );
        }
        assert!(db::get_user(&db.conn, &admin.id).unwrap().is_some());
    }

    #[test]
    fn deleting_unknown_user_is_not_found() {
        let mut db = TestDb::new();
        let admin = testing::admin(&mut db.conn, "root@clinic.test");
        for target in [Uuid::new_v4().to_string(), "garbage".to_string()] {
            let err = delete_user(&mut db.conn, &target, &admin).unwrap_err();
            assert!(matches!(err, ClinicError::NotFound(_)));
        }
    }

    #[test]
    fn deleting_doctor_cascades_without_orphans() {
        let mut db = TestDb::new();
        let admin = testing::admin(&mut db.conn, "root@clinic.test");
        let patient = testing::patient(&mut db.conn, "pat");
        let (doc_user, doctor) = testing::doctor(&mut db.conn, "jane@x.com", "Dr Jane");
        let (_, other) = testing::doctor(&mut db.conn, "sam@x.com", "Dr Sam");
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        crate::clinic::booking::book(
            &mut db.conn,
            &patient,
            crate::clinic::booking::BookingRequest {
                doctor_id: doctor.id.to_string(),
                date: date.to_string(),
                time: "10:00".into(),
                notes: None,
            },
        )
        .unwrap();
        crate::clinic::booking::book(
            &mut db.conn,
            &patient,
            crate::clinic::booking::BookingRequest {
                doctor_id: other.id.to_string(),
                date: date.to_string(),
                time: "10:00".into(),
                notes: None,
            },
        )
        .unwrap();
        crate::clinic::records::add_medical_record(
            &db.conn,
            &doctor,
            crate::clinic::records::NewRecord {
                patient_id: patient.id.to_string(),
                visit_date: "2024-06-01".into(),
                diagnosis: "Flu".into(),
                prescription: None,
                follow_up_date: None,
            },
        )
        .unwrap();

        let summary = delete_user(&mut db.conn, &doc_user.id.to_string(), &admin).unwrap();
        assert_eq!(
            summary,
            CascadeSummary {
                doctor_profiles: 1,
                appointments: 1,
                records: 1
            }
        );

        assert!(db::get_user(&db.conn, &doc_user.id).unwrap().is_none());
        assert!(db::get_doctor(&db.conn, &doctor.id).unwrap().is_none());
        let remaining = db::list_all_appointments(&db.conn).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].appointment.doctor_id, other.id);
        assert_eq!(remaining[0].appointment.status, AppointmentStatus::Booked);
        assert_eq!(db::count_records(&db.conn).unwrap(), 0);

        let orphans: i64 = db
            .conn
            .query_row(
                "SELECT COUNT(*) FROM appointments WHERE doctor_id NOT IN (SELECT id FROM doctors)
                 OR patient_id NOT IN (SELECT id FROM users)",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn deleting_patient_removes_their_appointments_and_records() {
        let mut db = TestDb::new();
        let admin = testing::admin(&mut db.conn, "root@clinic.test");
        let patient = testing::patient(&mut db.conn, "pat");
        let (_, doctor) = testing::doctor(&mut db.conn, "jane@x.com", "Dr Jane");

        crate::clinic::booking::book(
            &mut db.conn,
            &patient,
            crate::clinic::booking::BookingRequest {
                doctor_id: doctor.id.to_string(),
                date: "2024-06-01".into(),
                time: "09:00".into(),
                notes: Some("first visit".into()),
            },
        )
        .unwrap();
        crate::clinic::records::add_medical_record(
            &db.conn,
            &doctor,
            crate::clinic::records::NewRecord {
                patient_id: patient.id.to_string(),
                visit_date: "2024-06-01".into(),
                diagnosis: "Checkup".into(),
                prescription: Some("Rest".into()),
                follow_up_date: None,
            },
        )
        .unwrap();

        let summary = delete_user(&mut db.conn, &patient.id.to_string(), &admin).unwrap();
        assert_eq!(summary.doctor_profiles, 0);
        assert_eq!(summary.appointments, 1);
        assert_eq!(summary.records, 1);
        assert!(db::get_doctor(&db.conn, &doctor.id).unwrap().is_some());
    }

    #[test]
    fn seed_admin_is_idempotent() {
        let db = TestDb::new();
        assert!(seed_admin(&db.conn, "Root@Clinic.test", "admin-pass", TEST_ITERATIONS).unwrap());
        assert!(!seed_admin(&db.conn, "root@clinic.test", "other-pass", TEST_ITERATIONS).unwrap());
        let admin = db::get_user_by_email(&db.conn, "root@clinic.test").unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(verify_password("admin-pass", &admin.password_hash).unwrap());
    }
}
