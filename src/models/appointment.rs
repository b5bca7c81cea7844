use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::enums::AppointmentStatus;

/// A one-time booking between a patient and a doctor.
///
/// `doctor_name` and `speciality` are denormalized at creation time so the
/// patient's appointment list renders without a join.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub patient_id: Uuid,
    pub speciality: Option<String>,
    pub hospital_id: Uuid,
    /// yyyy-mm-dd, validated at the route layer.
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
