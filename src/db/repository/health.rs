use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{ConditionFlags, HealthCondition, HealthDocument};

use super::{parse_ts, parse_uuid};

/// Write the seven condition flags for a user, creating the record on
/// first write. Returns the record and whether it was newly created.
pub fn upsert_health_conditions(
    conn: &Connection,
    user_id: &Uuid,
    flags: &ConditionFlags,
) -> Result<(HealthCondition, bool), DatabaseError> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM health_conditions WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    let created = existing.is_none();

    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO health_conditions
             (id, user_id, diabetes, hypertension, asthma, heart_disease, arthritis,
              chronic_kidney_disease, thyroid_disorders, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
         ON CONFLICT (user_id) DO UPDATE SET
             diabetes = ?3, hypertension = ?4, asthma = ?5, heart_disease = ?6,
             arthritis = ?7, chronic_kidney_disease = ?8, thyroid_disorders = ?9,
             updated_at = ?10",
        params![
            Uuid::new_v4().to_string(),
            user_id.to_string(),
            flags.diabetes,
            flags.hypertension,
            flags.asthma,
            flags.heart_disease,
            flags.arthritis,
            flags.chronic_kidney_disease,
            flags.thyroid_disorders,
            now,
        ],
    )?;

    let record = get_health_by_user(conn, user_id)?.ok_or(DatabaseError::NotFound {
        entity_type: "HealthCondition".to_string(),
        id: user_id.to_string(),
    })?;
    Ok((record, created))
}

pub fn get_health_by_user(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Option<HealthCondition>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, user_id, diabetes, hypertension, asthma, heart_disease, arthritis,
                chronic_kidney_disease, thyroid_disorders, created_at, updated_at
         FROM health_conditions WHERE user_id = ?1",
        params![user_id.to_string()],
        map_row,
    );
    match result {
        Ok(row) => Ok(Some(health_from_row(conn, row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Attach an uploaded document to the user's health record, creating the
/// record with default flags when it does not exist yet.
pub fn insert_health_document(
    conn: &Connection,
    user_id: &Uuid,
    document: &HealthDocument,
) -> Result<(), DatabaseError> {
    let record_id = match get_record_id(conn, user_id)? {
        Some(id) => id,
        None => {
            let (record, _) = upsert_health_conditions(conn, user_id, &ConditionFlags::default())?;
            record.id.to_string()
        }
    };

    conn.execute(
        "INSERT INTO health_documents (id, health_condition_id, filename, path, upload_date, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            document.id.to_string(),
            record_id,
            document.filename,
            document.path,
            document.upload_date.to_rfc3339(),
            document.description,
        ],
    )?;
    Ok(())
}

pub fn list_health_documents(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Vec<HealthDocument>, DatabaseError> {
    match get_record_id(conn, user_id)? {
        Some(record_id) => load_documents(conn, &record_id),
        None => Ok(Vec::new()),
    }
}

/// Remove one of the user's documents. Returns the removed entry so the
/// caller can unlink the file on disk.
pub fn delete_health_document(
    conn: &Connection,
    user_id: &Uuid,
    document_id: &Uuid,
) -> Result<Option<HealthDocument>, DatabaseError> {
    let record_id = match get_record_id(conn, user_id)? {
        Some(id) => id,
        None => return Ok(None),
    };

    let result = conn.query_row(
        "SELECT id, filename, path, upload_date, description
         FROM health_documents WHERE id = ?1 AND health_condition_id = ?2",
        params![document_id.to_string(), record_id],
        map_document_row,
    );
    let document = match result {
        Ok(row) => document_from_row(row)?,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    conn.execute(
        "DELETE FROM health_documents WHERE id = ?1",
        params![document_id.to_string()],
    )?;
    Ok(Some(document))
}

fn get_record_id(conn: &Connection, user_id: &Uuid) -> Result<Option<String>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT id FROM health_conditions WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )
        .optional()?)
}

fn load_documents(
    conn: &Connection,
    record_id: &str,
) -> Result<Vec<HealthDocument>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, path, upload_date, description
         FROM health_documents WHERE health_condition_id = ?1 ORDER BY upload_date DESC",
    )?;
    let rows = stmt.query_map(params![record_id], map_document_row)?;
    let mut documents = Vec::new();
    for row in rows {
        documents.push(document_from_row(row?)?);
    }
    Ok(documents)
}

struct HealthRow {
    id: String,
    user_id: String,
    flags: ConditionFlags,
    created_at: String,
    updated_at: String,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HealthRow> {
    Ok(HealthRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        flags: ConditionFlags {
            diabetes: row.get(2)?,
            hypertension: row.get(3)?,
            asthma: row.get(4)?,
            heart_disease: row.get(5)?,
            arthritis: row.get(6)?,
            chronic_kidney_disease: row.get(7)?,
            thyroid_disorders: row.get(8)?,
        },
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn health_from_row(conn: &Connection, row: HealthRow) -> Result<HealthCondition, DatabaseError> {
    let documents = load_documents(conn, &row.id)?;
    Ok(HealthCondition {
        id: parse_uuid(&row.id)?,
        user_id: parse_uuid(&row.user_id)?,
        conditions: row.flags,
        documents,
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
    })
}

struct DocumentRow {
    id: String,
    filename: String,
    path: String,
    upload_date: String,
    description: Option<String>,
}

fn map_document_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        filename: row.get(1)?,
        path: row.get(2)?,
        upload_date: row.get(3)?,
        description: row.get(4)?,
    })
}

fn document_from_row(row: DocumentRow) -> Result<HealthDocument, DatabaseError> {
    Ok(HealthDocument {
        id: parse_uuid(&row.id)?,
        filename: row.filename,
        path: row.path,
        upload_date: parse_ts(&row.upload_date)?,
        description: row.description,
    })
}
