use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-patient chronic condition record. One row per user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCondition {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub conditions: ConditionFlags,
    pub documents: Vec<HealthDocument>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The seven boolean condition flags. Deserialized directly from the
/// request body on upsert; missing flags default to false.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionFlags {
    #[serde(default)]
    pub diabetes: bool,
    #[serde(default)]
    pub hypertension: bool,
    #[serde(default)]
    pub asthma: bool,
    #[serde(default)]
    pub heart_disease: bool,
    #[serde(default)]
    pub arthritis: bool,
    #[serde(default)]
    pub chronic_kidney_disease: bool,
    #[serde(default)]
    pub thyroid_disorders: bool,
}

/// An uploaded PDF attached to a patient's health record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDocument {
    pub id: Uuid,
    pub filename: String,
    /// Path relative to the uploads directory, persisted as a plain string.
    pub path: String,
    pub upload_date: DateTime<Utc>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_flags_default_to_false() {
        let flags: ConditionFlags =
            serde_json::from_str(r#"{"diabetes": true, "heartDisease": true}"#).unwrap();
        assert!(flags.diabetes);
        assert!(flags.heart_disease);
        assert!(!flags.asthma);
        assert!(!flags.chronic_kidney_disease);
    }

    #[test]
    fn flags_flatten_into_record() {
        let record = HealthCondition {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            conditions: ConditionFlags {
                hypertension: true,
                ..Default::default()
            },
            documents: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["hypertension"], true);
        assert_eq!(value["thyroidDisorders"], false);
    }
}
