use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Medicine, Prescription};

use super::{parse_ts, parse_uuid};

pub fn insert_prescription(
    conn: &Connection,
    prescription: &Prescription,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (id, patient_id, doctor_id, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            prescription.id.to_string(),
            prescription.patient_id.to_string(),
            prescription.doctor_id.to_string(),
            prescription.notes,
            prescription.created_at.to_rfc3339(),
            prescription.updated_at.to_rfc3339(),
        ],
    )?;

    for (position, medicine) in prescription.medicines.iter().enumerate() {
        let intake_time = serde_json::to_string(&medicine.intake_time)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
        conn.execute(
            "INSERT INTO prescription_medicines
                 (id, prescription_id, name, quantity, intake_time, duration, instructions, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                Uuid::new_v4().to_string(),
                prescription.id.to_string(),
                medicine.name,
                medicine.quantity,
                intake_time,
                medicine.duration,
                medicine.instructions,
                position as i64,
            ],
        )?;
    }
    Ok(())
}

/// Prescriptions written for a patient, most recent first.
pub fn list_prescriptions_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Prescription>, DatabaseError> {
    query_many(
        conn,
        "SELECT id, patient_id, doctor_id, notes, created_at, updated_at
         FROM prescriptions WHERE patient_id = ?1 ORDER BY created_at DESC",
        params![patient_id.to_string()],
    )
}

/// Prescriptions written by a doctor, most recent first.
pub fn list_prescriptions_by_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Prescription>, DatabaseError> {
    query_many(
        conn,
        "SELECT id, patient_id, doctor_id, notes, created_at, updated_at
         FROM prescriptions WHERE doctor_id = ?1 ORDER BY created_at DESC",
        params![doctor_id.to_string()],
    )
}

fn load_medicines(
    conn: &Connection,
    prescription_id: &str,
) -> Result<Vec<Medicine>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT name, quantity, intake_time, duration, instructions
         FROM prescription_medicines WHERE prescription_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![prescription_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
        ))
    })?;

    let mut medicines = Vec::new();
    for row in rows {
        let (name, quantity, intake_time, duration, instructions) = row?;
        medicines.push(Medicine {
            name,
            quantity,
            intake_time: serde_json::from_str(&intake_time)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            duration,
            instructions,
        });
    }
    Ok(medicines)
}

struct PrescriptionRow {
    id: String,
    patient_id: String,
    doctor_id: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PrescriptionRow> {
    Ok(PrescriptionRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        notes: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn prescription_from_row(
    conn: &Connection,
    row: PrescriptionRow,
) -> Result<Prescription, DatabaseError> {
    let medicines = load_medicines(conn, &row.id)?;
    Ok(Prescription {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        doctor_id: parse_uuid(&row.doctor_id)?,
        medicines,
        notes: row.notes,
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
    })
}

fn query_many(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map_row)?;
    let raw: Vec<PrescriptionRow> = rows.collect::<Result<_, _>>()?;
    let mut prescriptions = Vec::new();
    for row in raw {
        prescriptions.push(prescription_from_row(conn, row)?);
    }
    Ok(prescriptions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_user;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::{IntakeTime, Role};
    use crate::models::User;
    use chrono::Utc;

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

    fn sample_prescription(patient_id: Uuid, doctor_id: Uuid) -> Prescription {
        Prescription {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            medicines: vec![
                Medicine {
                    name: "Metformin".to_string(),
                    quantity: "500mg".to_string(),
                    intake_time: vec![IntakeTime::Morning, IntakeTime::Evening],
                    duration: "30 days".to_string(),
                    instructions: Some("With food".to_string()),
                },
                Medicine {
                    name: "Aspirin".to_string(),
                    quantity: "75mg".to_string(),
                    intake_time: vec![IntakeTime::AfterMeal],
                    duration: "15 days".to_string(),
                    instructions: None,
                },
            ],
            notes: Some("Review in a month".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn medicines_round_trip_in_order() {
        let conn = open_memory_database().unwrap();
        let (patient_id, doctor_id) = seed_pair(&conn);
        let prescription = sample_prescription(patient_id, doctor_id);
        insert_prescription(&conn, &prescription).unwrap();

        let loaded = list_prescriptions_by_patient(&conn, &patient_id).unwrap();
        assert_eq!(loaded.len(), 1);
        let medicines = &loaded[0].medicines;
        assert_eq!(medicines.len(), 2);
        assert_eq!(medicines[0].name, "Metformin");
        assert_eq!(
            medicines[0].intake_time,
            vec![IntakeTime::Morning, IntakeTime::Evening]
        );
        assert_eq!(medicines[1].name, "Aspirin");
    }

    #[test]
    fn doctor_list_only_contains_own_prescriptions() {
        let conn = open_memory_database().unwrap();
        let (patient_id, doctor_id) = seed_pair(&conn);
        insert_prescription(&conn, &sample_prescription(patient_id, doctor_id)).unwrap();

        assert_eq!(list_prescriptions_by_doctor(&conn, &doctor_id).unwrap().len(), 1);
        assert!(list_prescriptions_by_doctor(&conn, &patient_id).unwrap().is_empty());
    }
}
