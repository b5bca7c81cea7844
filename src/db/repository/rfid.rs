use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::RfidAssignment;

use super::{parse_ts, parse_uuid};

const RFID_COLUMNS: &str =
    "id, rfid_number, user_id, is_active, assigned_by, created_at, updated_at";

pub fn insert_rfid(conn: &Connection, rfid: &RfidAssignment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO rfid_assignments (id, rfid_number, user_id, is_active, assigned_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            rfid.id.to_string(),
            rfid.rfid_number,
            rfid.user_id.to_string(),
            rfid.is_active,
            rfid.assigned_by.to_string(),
            rfid.created_at.to_rfc3339(),
            rfid.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_rfid(conn: &Connection, id: &Uuid) -> Result<Option<RfidAssignment>, DatabaseError> {
    query_single(
        conn,
        &format!("SELECT {RFID_COLUMNS} FROM rfid_assignments WHERE id = ?1"),
        params![id.to_string()],
    )
}

/// Resolve an active card by its number. Inactive cards do not match.
pub fn get_active_rfid_by_number(
    conn: &Connection,
    rfid_number: &str,
) -> Result<Option<RfidAssignment>, DatabaseError> {
    query_single(
        conn,
        &format!(
            "SELECT {RFID_COLUMNS} FROM rfid_assignments
             WHERE rfid_number = ?1 AND is_active = 1"
        ),
        params![rfid_number],
    )
}

pub fn get_rfid_by_user(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Option<RfidAssignment>, DatabaseError> {
    query_single(
        conn,
        &format!("SELECT {RFID_COLUMNS} FROM rfid_assignments WHERE user_id = ?1"),
        params![user_id.to_string()],
    )
}

pub fn rfid_number_exists(conn: &Connection, rfid_number: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM rfid_assignments WHERE rfid_number = ?1",
        params![rfid_number],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn list_rfid_assignments(conn: &Connection) -> Result<Vec<RfidAssignment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RFID_COLUMNS} FROM rfid_assignments ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map([], map_row)?;
    let mut assignments = Vec::new();
    for row in rows {
        assignments.push(rfid_from_row(row?)?);
    }
    Ok(assignments)
}

pub fn update_rfid(conn: &Connection, rfid: &RfidAssignment) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE rfid_assignments
         SET rfid_number = ?2, user_id = ?3, is_active = ?4, assigned_by = ?5, updated_at = ?6
         WHERE id = ?1",
        params![
            rfid.id.to_string(),
            rfid.rfid_number,
            rfid.user_id.to_string(),
            rfid.is_active,
            rfid.assigned_by.to_string(),
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn delete_rfid(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM rfid_assignments WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(affected > 0)
}

struct RfidRow {
    id: String,
    rfid_number: String,
    user_id: String,
    is_active: bool,
    assigned_by: String,
    created_at: String,
    updated_at: String,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RfidRow> {
    Ok(RfidRow {
        id: row.get(0)?,
        rfid_number: row.get(1)?,
        user_id: row.get(2)?,
        is_active: row.get(3)?,
        assigned_by: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn rfid_from_row(row: RfidRow) -> Result<RfidAssignment, DatabaseError> {
    Ok(RfidAssignment {
        id: parse_uuid(&row.id)?,
        rfid_number: row.rfid_number,
        user_id: parse_uuid(&row.user_id)?,
        is_active: row.is_active,
        assigned_by: parse_uuid(&row.assigned_by)?,
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
    })
}

fn query_single(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Option<RfidAssignment>, DatabaseError> {
    match conn.query_row(sql, params, map_row) {
        Ok(row) => Ok(Some(rfid_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_user;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::Role;
    use crate::models::User;
    use chrono::Utc;

    fn seed_users(conn: &Connection) -> (Uuid, Uuid) {
        let mk = |email: &str, role: Role| User {
            id: Uuid::new_v4(),
            name: email.to_string(),
            email: email.to_string(),
            password_hash: "x".to_string(),
            role,
            phone: None,
            address: None,
            speciality: None,
            hospital_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let patient = mk("p@example.com", Role::Patient);
        let admin = mk("a@example.com", Role::Admin);
        insert_user(conn, &patient).unwrap();
        insert_user(conn, &admin).unwrap();
        (patient.id, admin.id)
    }

    fn sample_rfid(number: &str, user_id: Uuid, assigned_by: Uuid) -> RfidAssignment {
        RfidAssignment {
            id: Uuid::new_v4(),
            rfid_number: number.to_string(),
            user_id,
            is_active: true,
            assigned_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_number_is_unique_violation() {
        let conn = open_memory_database().unwrap();
        let (patient_id, admin_id) = seed_users(&conn);
        insert_rfid(&conn, &sample_rfid("CARD-1", patient_id, admin_id)).unwrap();
        let err = insert_rfid(&conn, &sample_rfid("CARD-1", patient_id, admin_id)).unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn inactive_cards_do_not_resolve() {
        let conn = open_memory_database().unwrap();
        let (patient_id, admin_id) = seed_users(&conn);
        let mut rfid = sample_rfid("CARD-2", patient_id, admin_id);
        rfid.is_active = false;
        insert_rfid(&conn, &rfid).unwrap();

        assert!(get_active_rfid_by_number(&conn, "CARD-2").unwrap().is_none());
        assert!(rfid_number_exists(&conn, "CARD-2").unwrap());
    }

    #[test]
    fn lookup_by_user_and_number() {
        let conn = open_memory_database().unwrap();
        let (patient_id, admin_id) = seed_users(&conn);
        insert_rfid(&conn, &sample_rfid("CARD-3", patient_id, admin_id)).unwrap();

        let by_number = get_active_rfid_by_number(&conn, "CARD-3").unwrap().unwrap();
        assert_eq!(by_number.user_id, patient_id);

        let by_user = get_rfid_by_user(&conn, &patient_id).unwrap().unwrap();
        assert_eq!(by_user.rfid_number, "CARD-3");
    }
}
