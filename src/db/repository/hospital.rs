use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::Hospital;

use super::{parse_ts, parse_uuid};

pub fn insert_hospital(conn: &Connection, hospital: &Hospital) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO hospitals (id, name, address, phone, email, website, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            hospital.id.to_string(),
            hospital.name,
            hospital.address,
            hospital.phone,
            hospital.email,
            hospital.website,
            hospital.created_at.to_rfc3339(),
            hospital.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_hospital(conn: &Connection, id: &Uuid) -> Result<Option<Hospital>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, name, address, phone, email, website, created_at, updated_at
         FROM hospitals WHERE id = ?1",
        params![id.to_string()],
        map_row,
    );
    match result {
        Ok(row) => Ok(Some(hospital_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_hospitals(conn: &Connection) -> Result<Vec<Hospital>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, address, phone, email, website, created_at, updated_at
         FROM hospitals ORDER BY name",
    )?;
    let rows = stmt.query_map([], map_row)?;
    let mut hospitals = Vec::new();
    for row in rows {
        hospitals.push(hospital_from_row(row?)?);
    }
    Ok(hospitals)
}

pub fn update_hospital(conn: &Connection, hospital: &Hospital) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE hospitals SET name = ?2, address = ?3, phone = ?4, email = ?5,
                              website = ?6, updated_at = ?7
         WHERE id = ?1",
        params![
            hospital.id.to_string(),
            hospital.name,
            hospital.address,
            hospital.phone,
            hospital.email,
            hospital.website,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn delete_hospital(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let affected =
        conn.execute("DELETE FROM hospitals WHERE id = ?1", params![id.to_string()])?;
    Ok(affected > 0)
}

struct HospitalRow {
    id: String,
    name: String,
    address: String,
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
    created_at: String,
    updated_at: String,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HospitalRow> {
    Ok(HospitalRow {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        website: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn hospital_from_row(row: HospitalRow) -> Result<Hospital, DatabaseError> {
    Ok(Hospital {
        id: parse_uuid(&row.id)?,
        name: row.name,
        address: row.address,
        phone: row.phone,
        email: row.email,
        website: row.website,
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::Utc;

    fn sample_hospital() -> Hospital {
        Hospital {
            id: Uuid::new_v4(),
            name: "City General".to_string(),
            address: "1 Main St".to_string(),
            phone: Some("555-0101".to_string()),
            email: None,
            website: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn insert_get_update_delete() {
        let conn = open_memory_database().unwrap();
        let mut hospital = sample_hospital();
        insert_hospital(&conn, &hospital).unwrap();

        let loaded = get_hospital(&conn, &hospital.id).unwrap().unwrap();
        assert_eq!(loaded.name, "City General");

        hospital.name = "City General West".to_string();
        update_hospital(&conn, &hospital).unwrap();
        let loaded = get_hospital(&conn, &hospital.id).unwrap().unwrap();
        assert_eq!(loaded.name, "City General West");

        assert!(delete_hospital(&conn, &hospital.id).unwrap());
        assert!(get_hospital(&conn, &hospital.id).unwrap().is_none());
    }

    #[test]
    fn list_orders_by_name() {
        let conn = open_memory_database().unwrap();
        let mut b = sample_hospital();
        b.name = "Beta Clinic".to_string();
        let mut a = sample_hospital();
        a.name = "Alpha Hospital".to_string();
        insert_hospital(&conn, &b).unwrap();
        insert_hospital(&conn, &a).unwrap();

        let names: Vec<String> =
            list_hospitals(&conn).unwrap().into_iter().map(|h| h.name).collect();
        assert_eq!(names, vec!["Alpha Hospital", "Beta Clinic"]);
    }
}
