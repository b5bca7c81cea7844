use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::IntakeTime;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub medicines: Vec<Medicine>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One prescribed medicine. Deserialized directly from the request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub name: String,
    pub quantity: String,
    #[serde(default)]
    pub intake_time: Vec<IntakeTime>,
    pub duration: String,
    pub instructions: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medicine_parses_wire_body() {
        let body = r#"{
            "name": "Metformin",
            "quantity": "500mg",
            "intakeTime": ["morning", "after_meal"],
            "duration": "30 days",
            "instructions": "With food"
        }"#;
        let med: Medicine = serde_json::from_str(body).unwrap();
        assert_eq!(med.name, "Metformin");
        assert_eq!(med.intake_time, vec![IntakeTime::Morning, IntakeTime::AfterMeal]);
    }

    #[test]
    fn intake_time_defaults_to_empty() {
        let body = r#"{"name":"X","quantity":"1","duration":"7 days"}"#;
        let med: Medicine = serde_json::from_str(body).unwrap();
        assert!(med.intake_time.is_empty());
        assert!(med.instructions.is_none());
    }
}
