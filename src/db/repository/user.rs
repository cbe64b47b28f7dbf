use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{enum_col, format_timestamp, timestamp_col, uuid_col};
use crate::db::DatabaseError;
use crate::models::*;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, name, gender, phone,
    address, emergency_contact, created_at";

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, role, name, gender, phone,
         address, emergency_contact, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            user.id.to_string(),
            user.username,
            user.email,
            user.password_hash,
            user.role.as_str(),
            user.name,
            user.gender,
            user.phone,
            user.address,
            user.emergency_contact,
            format_timestamp(&user.created_at),
        ],
    )?;
    Ok(())
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_col(row, 0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: enum_col(row, 4)?,
        name: row.get(5)?,
        gender: row.get(6)?,
        phone: row.get(7)?,
        address: row.get(8)?,
        emergency_contact: row.get(9)?,
        created_at: timestamp_col(row, 10)?,
    })
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id.to_string()],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool, DatabaseError> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE email = ?1", params![email], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

pub fn username_exists(conn: &Connection, username: &str) -> Result<bool, DatabaseError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// All users, newest first.
pub fn list_users(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map([], user_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Persist the mutable profile fields. Identity fields (email, role, username) never change here.
pub fn update_user_profile(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET name = ?2, gender = ?3, phone = ?4, address = ?5, emergency_contact = ?6
         WHERE id = ?1",
        params![
            user.id.to_string(),
            user.name,
            user.gender,
            user.phone,
            user.address,
            user.emergency_contact,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "user".into(),
            id: user.id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_user(conn: &Connection, id: &Uuid) -> Result<usize, DatabaseError> {
    let removed = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
    Ok(removed)
}

pub fn count_users_by_role(conn: &Connection, role: Role) -> Result<u64, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = ?1",
        params![role.as_str()],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}
