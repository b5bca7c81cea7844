pub mod api;
pub mod authorization;
pub mod chatbot;
pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod security;
pub mod uploads;
