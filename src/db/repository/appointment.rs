use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::AppointmentStatus;
use crate::models::Appointment;

use super::{parse_ts, parse_uuid};

const APPOINTMENT_COLUMNS: &str =
    "id, doctor_id, doctor_name, patient_id, speciality, hospital_id, date, time, status, \
     notes, created_at, updated_at";

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, doctor_id, doctor_name, patient_id, speciality, hospital_id, date, time, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            appt.id.to_string(),
            appt.doctor_id.to_string(),
            appt.doctor_name,
            appt.patient_id.to_string(),
            appt.speciality,
            appt.hospital_id.to_string(),
            appt.date,
            appt.time,
            appt.status.as_str(),
            appt.notes,
            appt.created_at.to_rfc3339(),
            appt.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Appointment>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
        params![id.to_string()],
        map_row,
    );
    match result {
        Ok(row) => Ok(Some(appointment_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_appointments(conn: &Connection) -> Result<Vec<Appointment>, DatabaseError> {
    query_many(
        conn,
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY date DESC, time DESC"),
        params![],
    )
}

pub fn list_appointments_by_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_many(
        conn,
        &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments
             WHERE doctor_id = ?1 ORDER BY date DESC, time DESC"
        ),
        params![doctor_id.to_string()],
    )
}

pub fn list_appointments_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    query_many(
        conn,
        &format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments
             WHERE patient_id = ?1 ORDER BY date DESC, time DESC"
        ),
        params![patient_id.to_string()],
    )
}

/// Set the appointment status; notes are applied only when provided.
pub fn set_appointment_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
    notes: Option<&str>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE appointments
         SET status = ?2, notes = COALESCE(?3, notes), updated_at = ?4
         WHERE id = ?1",
        params![
            id.to_string(),
            status.as_str(),
            notes,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Move the appointment to a new slot and force status back to rescheduled.
pub fn reschedule_appointment(
    conn: &Connection,
    id: &Uuid,
    date: &str,
    time: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE appointments
         SET date = ?2, time = ?3, status = 'rescheduled', updated_at = ?4
         WHERE id = ?1",
        params![id.to_string(), date, time, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn set_appointment_notes(
    conn: &Connection,
    id: &Uuid,
    notes: Option<&str>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE appointments SET notes = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.to_string(), notes, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn delete_appointment(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let affected =
        conn.execute("DELETE FROM appointments WHERE id = ?1", params![id.to_string()])?;
    Ok(affected > 0)
}

struct AppointmentRow {
    id: String,
    doctor_id: String,
    doctor_name: String,
    patient_id: String,
    speciality: Option<String>,
    hospital_id: String,
    date: String,
    time: String,
    status: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        doctor_id: row.get(1)?,
        doctor_name: row.get(2)?,
        patient_id: row.get(3)?,
        speciality: row.get(4)?,
        hospital_id: row.get(5)?,
        date: row.get(6)?,
        time: row.get(7)?,
        status: row.get(8)?,
        notes: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid(&row.id)?,
        doctor_id: parse_uuid(&row.doctor_id)?,
        doctor_name: row.doctor_name,
        patient_id: parse_uuid(&row.patient_id)?,
        speciality: row.speciality,
        hospital_id: parse_uuid(&row.hospital_id)?,
        date: row.date,
        time: row.time,
        status: AppointmentStatus::from_str(&row.status)?,
        notes: row.notes,
        created_at: parse_ts(&row.created_at)?,
        updated_at: parse_ts(&row.updated_at)?,
    })
}

fn query_many(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map_row)?;
    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(appointment_from_row(row?)?);
    }
    Ok(appointments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{insert_hospital, insert_user};
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::Role;
    use crate::models::{Hospital, User};
    use chrono::Utc;

    fn seed(conn: &Connection) -> (Uuid, Uuid, Uuid) {
        let hospital = Hospital {
            id: Uuid::new_v4(),
            name: "City General".to_string(),
            address: "1 Main St".to_string(),
            phone: None,
            email: None,
            website: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        insert_hospital(conn, &hospital).unwrap();

        let doctor = User {
            id: Uuid::new_v4(),
            name: "Dr. Rao".to_string(),
            email: "rao@example.com".to_string(),
            password_hash: "x".to_string(),
            role: Role::Doctor,
            phone: None,
            address: None,
            speciality: Some("Cardiology".to_string()),
            hospital_id: Some(hospital.id),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let patient = User {
            id: Uuid::new_v4(),
            name: "Pat".to_string(),
            email: "pat@example.com".to_string(),
            password_hash: "x".to_string(),
            role: Role::Patient,
            phone: None,
            address: None,
            speciality: None,
            hospital_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        insert_user(conn, &doctor).unwrap();
        insert_user(conn, &patient).unwrap();
        (doctor.id, patient.id, hospital.id)
    }

    fn sample_appointment(doctor_id: Uuid, patient_id: Uuid, hospital_id: Uuid) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            doctor_id,
            doctor_name: "Dr. Rao".to_string(),
            patient_id,
            speciality: Some("Cardiology".to_string()),
            hospital_id,
            date: "2026-09-01".to_string(),
            time: "10:30".to_string(),
            status: AppointmentStatus::Pending,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_list_by_doctor_and_patient() {
        let conn = open_memory_database().unwrap();
        let (doctor_id, patient_id, hospital_id) = seed(&conn);
        let appt = sample_appointment(doctor_id, patient_id, hospital_id);
        insert_appointment(&conn, &appt).unwrap();

        assert_eq!(list_appointments(&conn).unwrap().len(), 1);
        assert_eq!(list_appointments_by_doctor(&conn, &doctor_id).unwrap().len(), 1);
        assert_eq!(list_appointments_by_patient(&conn, &patient_id).unwrap().len(), 1);
        assert!(list_appointments_by_patient(&conn, &doctor_id).unwrap().is_empty());
    }

    #[test]
    fn status_update_keeps_notes_when_absent() {
        let conn = open_memory_database().unwrap();
        let (doctor_id, patient_id, hospital_id) = seed(&conn);
        let mut appt = sample_appointment(doctor_id, patient_id, hospital_id);
        appt.notes = Some("initial".to_string());
        insert_appointment(&conn, &appt).unwrap();

        set_appointment_status(&conn, &appt.id, AppointmentStatus::Approved, None).unwrap();
        let loaded = get_appointment(&conn, &appt.id).unwrap().unwrap();
        assert_eq!(loaded.status, AppointmentStatus::Approved);
        assert_eq!(loaded.notes.as_deref(), Some("initial"));

        set_appointment_status(&conn, &appt.id, AppointmentStatus::Completed, Some("seen")).unwrap();
        let loaded = get_appointment(&conn, &appt.id).unwrap().unwrap();
        assert_eq!(loaded.notes.as_deref(), Some("seen"));
    }

    #[test]
    fn reschedule_forces_status() {
        let conn = open_memory_database().unwrap();
        let (doctor_id, patient_id, hospital_id) = seed(&conn);
        let mut appt = sample_appointment(doctor_id, patient_id, hospital_id);
        appt.status = AppointmentStatus::Approved;
        insert_appointment(&conn, &appt).unwrap();

        reschedule_appointment(&conn, &appt.id, "2026-09-15", "14:00").unwrap();
        let loaded = get_appointment(&conn, &appt.id).unwrap().unwrap();
        assert_eq!(loaded.status, AppointmentStatus::Rescheduled);
        assert_eq!(loaded.date, "2026-09-15");
        assert_eq!(loaded.time, "14:00");
    }
}
