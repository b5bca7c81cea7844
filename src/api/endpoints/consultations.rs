//! Standing doctor-patient consulting relationships.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::middleware::auth::require_doctor;
use crate::api::types::{ApiContext, AuthContext};
use crate::authorization::{check_access, Action};
use crate::db::repository;
use crate::models::enums::Role;

use super::users::parse_id;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddByRfidRequest {
    rfid_number: Option<String>,
    notes: Option<String>,
}

/// Card-tap flow: the doctor scans a patient's RFID card and the
/// consulting relationship is created or refreshed in one call.
pub async fn add_by_rfid(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddByRfidRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if auth.user.role != Role::Doctor {
        return Err(ApiError::Forbidden(
            "Only doctors can add consulting relationships".to_string(),
        ));
    }

    let rfid_number = req
        .rfid_number
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("RFID number is required".to_string()))?;

    let conn = ctx.core.lock_db()?;
    let assignment = repository::get_active_rfid_by_number(&conn, rfid_number)?
        .ok_or_else(|| ApiError::NotFound("Invalid or inactive RFID card".to_string()))?;
    let patient = repository::get_user(&conn, &assignment.user_id)?
        .filter(|user| user.role == Role::Patient)
        .ok_or_else(|| ApiError::NotFound("Patient not found".to_string()))?;

    let consultation = repository::upsert_consultation(
        &conn,
        &patient.id,
        &auth.user.id,
        Utc::now(),
        req.notes.as_deref(),
    )?;

    tracing::info!(
        consultation_id = %consultation.id,
        doctor_id = %auth.user.id,
        "Consultation recorded via RFID"
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "consultation": consultation,
        })),
    ))
}

pub async fn by_patient(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let patient_id = parse_id(&patient_id, "Patient not found")?;
    if !check_access(&auth.principal(), Action::ViewPatientRecords { patient_id }).allowed {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    let conn = ctx.core.lock_db()?;
    let consultations = repository::list_consultations_by_patient(&conn, &patient_id)?;
    Ok(Json(json!({ "success": true, "consultations": consultations })))
}

pub async fn by_doctor(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, ApiError> {
    require_doctor(&auth)
        .map_err(|_| ApiError::Forbidden("Access denied".to_string()))?;
    let conn = ctx.core.lock_db()?;
    let consultations = repository::list_consultations_by_doctor(&conn, &auth.user.id)?;
    Ok(Json(json!({ "success": true, "consultations": consultations })))
}
