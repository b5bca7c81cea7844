use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::User;

use super::{parse_ts, parse_uuid};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, phone, address, speciality, hospital_id, \
     created_at, updated_at";

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, role, phone, address, speciality, hospital_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            user.id.to_string(),
            user.name,
            user.email,
            user.password_hash,
            user.role.as_str(),
            user.phone,
            user.address,
            user.speciality,
            user.hospital_id.map(|h| h.to_string()),
            user.created_at.to_rfc3339(),
            user.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    query_single(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id.to_string()],
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    query_single(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        params![email.to_lowercase()],
    )
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    query_many(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"),
        params![],
    )
}

pub fn list_doctors(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    query_many(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users WHERE role = 'doctor' ORDER BY name"),
        params![],
    )
}

pub fn list_doctors_by_hospital(
    conn: &Connection,
    hospital_id: &Uuid,
) -> Result<Vec<User>, DatabaseError> {
    query_many(
        conn,
        &format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE role = 'doctor' AND hospital_id = ?1 ORDER BY name"
        ),
        params![hospital_id.to_string()],
    )
}

pub fn list_doctors_by_speciality(
    conn: &Connection,
    speciality: &str,
) -> Result<Vec<User>, DatabaseError> {
    query_many(
        conn,
        &format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE role = 'doctor' AND speciality = ?1 COLLATE NOCASE ORDER BY name"
        ),
        params![speciality],
    )
}

/// Distinct speciality strings across all doctors.
pub fn list_specialities(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT speciality FROM users
         WHERE role = 'doctor' AND speciality IS NOT NULL ORDER BY speciality",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut specialities = Vec::new();
    for row in rows {
        specialities.push(row?);
    }
    Ok(specialities)
}

/// Update mutable profile fields. Role is intentionally not updatable.
pub fn update_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE users SET name = ?2, email = ?3, phone = ?4, address = ?5,
                          speciality = ?6, hospital_id = ?7, updated_at = ?8
         WHERE id = ?1",
        params![
            user.id.to_string(),
            user.name,
            user.email,
            user.phone,
            user.address,
            user.speciality,
            user.hospital_id.map(|h| h.to_string()),
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn set_doctor_hospital(
    conn: &Connection,
    doctor_id: &Uuid,
    hospital_id: &Uuid,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE users SET hospital_id = ?2, updated_at = ?3 WHERE id = ?1",
        params![
            doctor_id.to_string(),
            hospital_id.to_string(),
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn delete_user(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let affected = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
    Ok(affected > 0)
}

pub fn count_doctors_in_hospital(
    conn: &Connection,
    hospital_id: &Uuid,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = 'doctor' AND hospital_id = ?1",
        params![hospital_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ── Row mapping ─────────────────────────────────────────────

struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    phone: Option<String>,
    address: Option<String>,
    speciality: Option<String>,
    hospital_id: Option<String>,
    created_at: String,
    updated_at: String,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        phone: row.get(5)?,
        address: row.get(6)?,
        speciality: row.get(7)?,
        hospital_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    Ok(User {
        id: parse_uuid(&row.id)?,
        name: row.name,
        email: row.email,
        password_hash: row.password_hash,
        role: Role::from_str(&row.role)?,
        phone: row.phone,
        address: row.address,
        speciality: row.speciality,
        hospital_id: row.hospital_id.as_deref().map(parse_uuid).transpose()?,
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
    })
}

fn query_single(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Option<User>, DatabaseError> {
    match conn.query_row(sql, params, map_row) {
        Ok(row) => Ok(Some(user_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn query_many(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map_row)?;
    let mut users = Vec::new();
    for row in rows {
        users.push(user_from_row(row?)?);
    }
    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::Utc;

    fn sample_user(email: &str, role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role,
            phone: None,
            address: None,
            speciality: (role == Role::Doctor).then(|| "Cardiology".to_string()),
            hospital_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let user = sample_user("a@example.com", Role::Patient);
        insert_user(&conn, &user).unwrap();

        let loaded = get_user(&conn, &user.id).unwrap().unwrap();
        assert_eq!(loaded.email, "a@example.com");
        assert_eq!(loaded.role, Role::Patient);
        assert_eq!(loaded.password_hash, "hash");
    }

    #[test]
    fn get_missing_user_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_user(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_unique_violation() {
        let conn = open_memory_database().unwrap();
        insert_user(&conn, &sample_user("dup@example.com", Role::Patient)).unwrap();
        let err = insert_user(&conn, &sample_user("dup@example.com", Role::Patient)).unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn list_doctors_filters_by_role() {
        let conn = open_memory_database().unwrap();
        insert_user(&conn, &sample_user("p@example.com", Role::Patient)).unwrap();
        insert_user(&conn, &sample_user("d@example.com", Role::Doctor)).unwrap();

        let doctors = list_doctors(&conn).unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0].email, "d@example.com");
    }

    #[test]
    fn specialities_are_distinct() {
        let conn = open_memory_database().unwrap();
        insert_user(&conn, &sample_user("d1@example.com", Role::Doctor)).unwrap();
        insert_user(&conn, &sample_user("d2@example.com", Role::Doctor)).unwrap();

        let specialities = list_specialities(&conn).unwrap();
        assert_eq!(specialities, vec!["Cardiology".to_string()]);
    }

    #[test]
    fn delete_reports_whether_row_existed() {
        let conn = open_memory_database().unwrap();
        let user = sample_user("del@example.com", Role::Patient);
        insert_user(&conn, &user).unwrap();

        assert!(delete_user(&conn, &user.id).unwrap());
        assert!(!delete_user(&conn, &user.id).unwrap());
    }
}
