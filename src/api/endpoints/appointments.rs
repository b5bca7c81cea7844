//! Appointment booking and lifecycle.

use std::str::FromStr;
use std::sync::LazyLock;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::middleware::auth::{require_admin_or_doctor, require_patient};
use crate::api::types::{ApiContext, AuthContext};
use crate::authorization::{check_access, Action};
use crate::db::repository;
use crate::models::enums::{AppointmentStatus, Role};
use crate::models::Appointment;

use super::users::parse_id;

static DATE_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

fn validate_date(date: &str) -> Result<(), ApiError> {
    if DATE_FORMAT.is_match(date) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(
            "Date must be in yyyy-mm-dd format".to_string(),
        ))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    doctor_id: Option<String>,
    date: Option<String>,
    time: Option<String>,
    hospital_id: Option<String>,
    notes: Option<String>,
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_patient(&auth)?;

    let doctor_raw = req.doctor_id.as_deref().unwrap_or("").trim().to_string();
    let date = req.date.as_deref().unwrap_or("").trim().to_string();
    let time = req.time.as_deref().unwrap_or("").trim().to_string();
    let hospital_raw = req.hospital_id.as_deref().unwrap_or("").trim().to_string();
    if doctor_raw.is_empty() || date.is_empty() || time.is_empty() || hospital_raw.is_empty() {
        return Err(ApiError::BadRequest(
            "Doctor ID, date, time, and hospital ID are required".to_string(),
        ));
    }
    validate_date(&date)?;

    let doctor_id = Uuid::parse_str(&doctor_raw)
        .map_err(|_| ApiError::BadRequest("Invalid doctor ID".to_string()))?;
    let hospital_id = Uuid::parse_str(&hospital_raw)
        .map_err(|_| ApiError::NotFound("Hospital not found".to_string()))?;

    let conn = ctx.core.lock_db()?;
    let doctor = repository::get_user(&conn, &doctor_id)?
        .filter(|user| user.role == Role::Doctor)
        .ok_or_else(|| ApiError::BadRequest("Invalid doctor ID".to_string()))?;
    if repository::get_hospital(&conn, &hospital_id)?.is_none() {
        return Err(ApiError::NotFound("Hospital not found".to_string()));
    }

    let now = Utc::now();
    let appointment = Appointment {
        id: Uuid::new_v4(),
        doctor_id,
        doctor_name: doctor.name.clone(),
        patient_id: auth.user.id,
        speciality: doctor.speciality.clone(),
        hospital_id,
        date,
        time,
        status: AppointmentStatus::Pending,
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };
    repository::insert_appointment(&conn, &appointment)?;

    tracing::info!(appointment_id = %appointment.id, "Appointment created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Appointment created successfully",
            "appointment": appointment,
        })),
    ))
}

/// Admins see everything, doctors their assigned appointments, patients
/// their own.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let appointments = match auth.user.role {
        Role::Admin => repository::list_appointments(&conn)?,
        Role::Doctor => repository::list_appointments_by_doctor(&conn, &auth.user.id)?,
        Role::Patient => repository::list_appointments_by_patient(&conn, &auth.user.id)?,
    };
    Ok(Json(json!({ "success": true, "appointments": appointments })))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let appointment_id = parse_id(&id, "Appointment not found")?;
    let conn = ctx.core.lock_db()?;
    let appointment = repository::get_appointment(&conn, &appointment_id)?
        .ok_or_else(|| ApiError::NotFound("Appointment not found".to_string()))?;

    let action = Action::ViewAppointment {
        patient_id: appointment.patient_id,
        doctor_id: appointment.doctor_id,
    };
    if !check_access(&auth.principal(), action).allowed {
        return Err(ApiError::Forbidden(
            "Not authorized to access this appointment".to_string(),
        ));
    }
    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    status: Option<String>,
    notes: Option<String>,
}

pub async fn set_status(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin_or_doctor(&auth)?;
    let appointment_id = parse_id(&id, "Appointment not found")?;

    let status = req
        .status
        .as_deref()
        .and_then(|s| AppointmentStatus::from_str(s).ok())
        .ok_or_else(|| ApiError::BadRequest("Invalid status value".to_string()))?;

    let conn = ctx.core.lock_db()?;
    let appointment = repository::get_appointment(&conn, &appointment_id)?
        .ok_or_else(|| ApiError::NotFound("Appointment not found".to_string()))?;

    let action = Action::SetAppointmentStatus {
        doctor_id: appointment.doctor_id,
    };
    if !check_access(&auth.principal(), action).allowed {
        return Err(ApiError::Forbidden(
            "Not authorized to update this appointment".to_string(),
        ));
    }

    repository::set_appointment_status(&conn, &appointment_id, status, req.notes.as_deref())?;
    let appointment = repository::get_appointment(&conn, &appointment_id)?
        .ok_or_else(|| ApiError::NotFound("Appointment not found".to_string()))?;
    Ok(Json(json!({
        "success": true,
        "message": "Appointment status updated successfully",
        "appointment": appointment,
    })))
}

#[derive(Deserialize)]
pub struct RescheduleRequest {
    date: Option<String>,
    time: Option<String>,
}

pub async fn reschedule(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<Value>, ApiError> {
    require_patient(&auth)?;
    let appointment_id = parse_id(&id, "Appointment not found")?;

    let date = req.date.as_deref().unwrap_or("").trim().to_string();
    let time = req.time.as_deref().unwrap_or("").trim().to_string();
    if date.is_empty() || time.is_empty() {
        return Err(ApiError::BadRequest("Date and time are required".to_string()));
    }
    validate_date(&date)?;

    let conn = ctx.core.lock_db()?;
    let appointment = repository::get_appointment(&conn, &appointment_id)?
        .ok_or_else(|| ApiError::NotFound("Appointment not found".to_string()))?;

    let action = Action::RescheduleAppointment {
        patient_id: appointment.patient_id,
    };
    if !check_access(&auth.principal(), action).allowed {
        return Err(ApiError::Forbidden(
            "Not authorized to reschedule this appointment".to_string(),
        ));
    }

    repository::reschedule_appointment(&conn, &appointment_id, &date, &time)?;
    let appointment = repository::get_appointment(&conn, &appointment_id)?
        .ok_or_else(|| ApiError::NotFound("Appointment not found".to_string()))?;
    Ok(Json(json!({
        "success": true,
        "message": "Appointment rescheduled successfully",
        "appointment": appointment,
    })))
}

#[derive(Deserialize)]
pub struct NotesRequest {
    notes: Option<String>,
}

pub async fn update_notes(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<NotesRequest>,
) -> Result<Json<Value>, ApiError> {
    let appointment_id = parse_id(&id, "Appointment not found")?;
    let conn = ctx.core.lock_db()?;
    let appointment = repository::get_appointment(&conn, &appointment_id)?
        .ok_or_else(|| ApiError::NotFound("Appointment not found".to_string()))?;

    let action = Action::ModifyAppointment {
        patient_id: appointment.patient_id,
        doctor_id: appointment.doctor_id,
    };
    if !check_access(&auth.principal(), action).allowed {
        return Err(ApiError::Forbidden(
            "Not authorized to update this appointment".to_string(),
        ));
    }

    repository::set_appointment_notes(&conn, &appointment_id, req.notes.as_deref())?;
    let appointment = repository::get_appointment(&conn, &appointment_id)?
        .ok_or_else(|| ApiError::NotFound("Appointment not found".to_string()))?;
    Ok(Json(json!({
        "success": true,
        "message": "Appointment updated successfully",
        "appointment": appointment,
    })))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let appointment_id = parse_id(&id, "Appointment not found")?;
    let conn = ctx.core.lock_db()?;
    let appointment = repository::get_appointment(&conn, &appointment_id)?
        .ok_or_else(|| ApiError::NotFound("Appointment not found".to_string()))?;

    let action = Action::ModifyAppointment {
        patient_id: appointment.patient_id,
        doctor_id: appointment.doctor_id,
    };
    if !check_access(&auth.principal(), action).allowed {
        return Err(ApiError::Forbidden(
            "Not authorized to delete this appointment".to_string(),
        ));
    }

    repository::delete_appointment(&conn, &appointment_id)?;
    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted successfully",
    })))
}
