use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Links a physical RFID card number to exactly one patient account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RfidAssignment {
    pub id: Uuid,
    pub rfid_number: String,
    pub user_id: Uuid,
    pub is_active: bool,
    /// The admin or doctor who performed the assignment.
    pub assigned_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
