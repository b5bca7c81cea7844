use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::enums::ConsultationStatus;

/// A standing doctor–patient relationship, distinct from a one-time
/// appointment. Unique per (patient, doctor) pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub status: ConsultationStatus,
    pub last_consultation_date: DateTime<Utc>,
    pub consultation_history: Vec<ConsultationNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One visit note in a consultation's running history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationNote {
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}
