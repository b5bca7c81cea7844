use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::ConsultationStatus;
use crate::models::{Consultation, ConsultationNote};

use super::{parse_ts, parse_uuid};

/// Create or refresh the consulting relationship for a (patient, doctor)
/// pair and append one history entry.
///
/// The upsert is a single `INSERT ... ON CONFLICT DO UPDATE` against the
/// unique (patient_id, doctor_id) index, so concurrent callers cannot
/// create a duplicate pair; the loser of the race updates the same row.
/// The row refresh and the history append commit together or not at all.
pub fn upsert_consultation(
    conn: &Connection,
    patient_id: &Uuid,
    doctor_id: &Uuid,
    date: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<Consultation, DatabaseError> {
    let now = date.to_rfc3339();
    let tx = conn.unchecked_transaction()?;
    let consultation_id: String = tx.query_row(
        "INSERT INTO consultations
             (id, patient_id, doctor_id, status, last_consultation_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'active', ?4, ?4, ?4)
         ON CONFLICT (patient_id, doctor_id) DO UPDATE
             SET status = 'active', last_consultation_date = ?4, updated_at = ?4
         RETURNING id",
        params![
            Uuid::new_v4().to_string(),
            patient_id.to_string(),
            doctor_id.to_string(),
            now,
        ],
        |row| row.get(0),
    )?;

    tx.execute(
        "INSERT INTO consultation_history (id, consultation_id, date, notes)
         VALUES (?1, ?2, ?3, ?4)",
        params![Uuid::new_v4().to_string(), consultation_id, now, notes],
    )?;
    tx.commit()?;

    let id = parse_uuid(&consultation_id)?;
    get_consultation_by_id(conn, &id)?.ok_or(DatabaseError::NotFound {
        entity_type: "Consultation".to_string(),
        id: consultation_id,
    })
}

pub fn get_consultation_by_id(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Consultation>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, patient_id, doctor_id, status, last_consultation_date, created_at, updated_at
         FROM consultations WHERE id = ?1",
        params![id.to_string()],
        map_row,
    );
    match result {
        Ok(row) => Ok(Some(consultation_from_row(conn, row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_consultation(
    conn: &Connection,
    patient_id: &Uuid,
    doctor_id: &Uuid,
) -> Result<Option<Consultation>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, patient_id, doctor_id, status, last_consultation_date, created_at, updated_at
         FROM consultations WHERE patient_id = ?1 AND doctor_id = ?2",
        params![patient_id.to_string(), doctor_id.to_string()],
        map_row,
    );
    match result {
        Ok(row) => Ok(Some(consultation_from_row(conn, row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Active consultations for a patient, most recent first.
pub fn list_consultations_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Consultation>, DatabaseError> {
    query_many(
        conn,
        "SELECT id, patient_id, doctor_id, status, last_consultation_date, created_at, updated_at
         FROM consultations
         WHERE patient_id = ?1 AND status = 'active'
         ORDER BY last_consultation_date DESC",
        params![patient_id.to_string()],
    )
}

/// Active consultations for a doctor, most recent first.
pub fn list_consultations_by_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Consultation>, DatabaseError> {
    query_many(
        conn,
        "SELECT id, patient_id, doctor_id, status, last_consultation_date, created_at, updated_at
         FROM consultations
         WHERE doctor_id = ?1 AND status = 'active'
         ORDER BY last_consultation_date DESC",
        params![doctor_id.to_string()],
    )
}

fn load_history(
    conn: &Connection,
    consultation_id: &str,
) -> Result<Vec<ConsultationNote>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT date, notes FROM consultation_history
         WHERE consultation_id = ?1 ORDER BY date ASC",
    )?;
    let rows = stmt.query_map(params![consultation_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
    })?;
    let mut history = Vec::new();
    for row in rows {
        let (date, notes) = row?;
        history.push(ConsultationNote {
            date: parse_ts(&date)?,
            notes,
        });
    }
    Ok(history)
}

struct ConsultationRow {
    id: String,
    patient_id: String,
    doctor_id: String,
    status: String,
    last_consultation_date: String,
    created_at: String,
    updated_at: String,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConsultationRow> {
    Ok(ConsultationRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        status: row.get(3)?,
        last_consultation_date: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn consultation_from_row(
    conn: &Connection,
    row: ConsultationRow,
) -> Result<Consultation, DatabaseError> {
    let history = load_history(conn, &row.id)?;
    Ok(Consultation {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        doctor_id: parse_uuid(&row.doctor_id)?,
        status: ConsultationStatus::from_str(&row.status)?,
        last_consultation_date: parse_ts(&row.last_consultation_date)?,
        consultation_history: history,
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
    })
}

fn query_many(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Consultation>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map_row)?;
    let raw: Vec<ConsultationRow> = rows.collect::<Result<_, _>>()?;
    let mut consultations = Vec::new();
    for row in raw {
        consultations.push(consultation_from_row(conn, row)?);
    }
    Ok(consultations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_user;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::Role;
    use crate::models::User;

    fn seed_pair(conn: &Connection) -> (Uuid, Uuid) {
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
        let doctor = mk("d@example.com", Role::Doctor);
        insert_user(conn, &patient).unwrap();
        insert_user(conn, &doctor).unwrap();
        (patient.id, doctor.id)
    }

    #[test]
    fn first_upsert_creates_with_one_history_entry() {
        let conn = open_memory_database().unwrap();
        let (patient_id, doctor_id) = seed_pair(&conn);

        let consultation =
            upsert_consultation(&conn, &patient_id, &doctor_id, Utc::now(), Some("first visit"))
                .unwrap();

        assert_eq!(consultation.status, ConsultationStatus::Active);
        assert_eq!(consultation.consultation_history.len(), 1);
        assert_eq!(
            consultation.consultation_history[0].notes.as_deref(),
            Some("first visit")
        );
    }

    #[test]
    fn second_upsert_updates_not_duplicates() {
        let conn = open_memory_database().unwrap();
        let (patient_id, doctor_id) = seed_pair(&conn);

        let first =
            upsert_consultation(&conn, &patient_id, &doctor_id, Utc::now(), Some("one")).unwrap();
        let second =
            upsert_consultation(&conn, &patient_id, &doctor_id, Utc::now(), Some("two")).unwrap();

        assert_eq!(first.id, second.id, "Same pair must reuse the row");
        assert_eq!(second.consultation_history.len(), 2);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM consultations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn upsert_reactivates_inactive_relationship() {
        let conn = open_memory_database().unwrap();
        let (patient_id, doctor_id) = seed_pair(&conn);

        let consultation =
            upsert_consultation(&conn, &patient_id, &doctor_id, Utc::now(), None).unwrap();
        conn.execute(
            "UPDATE consultations SET status = 'inactive' WHERE id = ?1",
            params![consultation.id.to_string()],
        )
        .unwrap();

        let refreshed =
            upsert_consultation(&conn, &patient_id, &doctor_id, Utc::now(), None).unwrap();
        assert_eq!(refreshed.status, ConsultationStatus::Active);
    }

    #[test]
    fn failed_history_append_rolls_back_the_upsert() {
        let conn = open_memory_database().unwrap();
        let (patient_id, doctor_id) = seed_pair(&conn);
        conn.execute_batch("DROP TABLE consultation_history").unwrap();

        let result = upsert_consultation(&conn, &patient_id, &doctor_id, Utc::now(), Some("x"));
        assert!(result.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM consultations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0, "A half-applied upsert must not persist");
    }

    #[test]
    fn patient_list_ordered_by_recency() {
        let conn = open_memory_database().unwrap();
        let (patient_id, doctor_a) = seed_pair(&conn);
        let doctor_b = {
            let user = User {
                id: Uuid::new_v4(),
                name: "d2".to_string(),
                email: "d2@example.com".to_string(),
                password_hash: "x".to_string(),
                role: Role::Doctor,
                phone: None,
                address: None,
                speciality: None,
                hospital_id: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            insert_user(&conn, &user).unwrap();
            user.id
        };

        let earlier = Utc::now() - chrono::Duration::days(1);
        upsert_consultation(&conn, &patient_id, &doctor_a, earlier, None).unwrap();
        upsert_consultation(&conn, &patient_id, &doctor_b, Utc::now(), None).unwrap();

        let list = list_consultations_by_patient(&conn, &patient_id).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].doctor_id, doctor_b, "Most recent first");
    }
}
