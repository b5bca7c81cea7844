pub mod appointment;
pub mod consultation;
pub mod enums;
pub mod health;
pub mod hospital;
pub mod prescription;
pub mod rfid;
pub mod user;

pub use appointment::Appointment;
pub use consultation::{Consultation, ConsultationNote};
pub use health::{ConditionFlags, HealthCondition, HealthDocument};
pub use hospital::Hospital;
pub use prescription::{Medicine, Prescription};
pub use rfid::RfidAssignment;
pub use user::User;
