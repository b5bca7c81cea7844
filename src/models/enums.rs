use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Role {
    Patient => "patient",
    Doctor => "doctor",
    Admin => "admin",
});

str_enum!(AppointmentStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Completed => "completed",
    Rescheduled => "rescheduled",
});

str_enum!(ConsultationStatus {
    Active => "active",
    Inactive => "inactive",
});

str_enum!(IntakeTime {
    Morning => "morning",
    Afternoon => "afternoon",
    Evening => "evening",
    Night => "night",
    BeforeMeal => "before_meal",
    AfterMeal => "after_meal",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trip() {
        for role in [Role::Patient, Role::Doctor, Role::Admin] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = Role::from_str("superuser").unwrap_err();
        assert!(err.to_string().contains("superuser"));
    }

    #[test]
    fn appointment_status_serializes_lowercase() {
        let json = serde_json::to_string(&AppointmentStatus::Rescheduled).unwrap();
        assert_eq!(json, "\"rescheduled\"");
    }

    #[test]
    fn intake_time_snake_case_wire_format() {
        let json = serde_json::to_string(&IntakeTime::BeforeMeal).unwrap();
        assert_eq!(json, "\"before_meal\"");
        let parsed: IntakeTime = serde_json::from_str("\"after_meal\"").unwrap();
        assert_eq!(parsed, IntakeTime::AfterMeal);
    }
}
