pub mod appointments;
pub mod auth;
pub mod chatbot;
pub mod consultations;
pub mod doctors;
pub mod health;
pub mod hospitals;
pub mod prescriptions;
pub mod rfid;
pub mod users;
