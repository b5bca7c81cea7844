use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::enums::Role;

/// A platform account: patient, doctor, or admin.
///
/// `password_hash` is never serialized; every route that returns a user
/// returns this struct, so the hash cannot leak into a response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Required when role is doctor.
    pub speciality: Option<String>,
    /// Required when role is doctor.
    pub hospital_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_doctor(&self) -> bool {
        self.role == Role::Doctor
    }

    pub fn is_patient(&self) -> bool {
        self.role == Role::Patient
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Asha Verma".to_string(),
            email: "asha@example.com".to_string(),
            password_hash: "pbkdf2-sha256$secret".to_string(),
            role: Role::Patient,
            phone: None,
            address: None,
            speciality: None,
            hospital_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_never_serialized() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn wire_keys_are_camel_case() {
        let value = serde_json::to_value(sample_user()).unwrap();
        assert!(value.get("hospitalId").is_some());
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["role"], "patient");
    }
}
