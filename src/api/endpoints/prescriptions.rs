//! Prescription writing and retrieval.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::middleware::auth::require_doctor;
use crate::api::types::{ApiContext, AuthContext};
use crate::authorization::{check_access, Action};
use crate::db::repository;
use crate::models::enums::Role;
use crate::models::{Medicine, Prescription};

use super::users::parse_id;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrescriptionRequest {
    patient_id: Option<String>,
    medicines: Option<Vec<Medicine>>,
    notes: Option<String>,
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if auth.user.role != Role::Doctor {
        return Err(ApiError::Forbidden(
            "Only doctors can create prescriptions".to_string(),
        ));
    }

    let patient_raw = req.patient_id.as_deref().unwrap_or("").trim().to_string();
    let medicines = req.medicines.unwrap_or_default();
    if patient_raw.is_empty() || medicines.is_empty() {
        return Err(ApiError::BadRequest(
            "Patient ID and medicines are required".to_string(),
        ));
    }
    for medicine in &medicines {
        if medicine.name.trim().is_empty()
            || medicine.quantity.trim().is_empty()
            || medicine.duration.trim().is_empty()
        {
            return Err(ApiError::BadRequest(
                "Each medicine requires a name, quantity, and duration".to_string(),
            ));
        }
    }

    let patient_id = Uuid::parse_str(&patient_raw)
        .map_err(|_| ApiError::NotFound("Patient not found".to_string()))?;

    let conn = ctx.core.lock_db()?;
    repository::get_user(&conn, &patient_id)?
        .filter(|user| user.role == Role::Patient)
        .ok_or_else(|| ApiError::NotFound("Patient not found".to_string()))?;

    let now = Utc::now();
    let prescription = Prescription {
        id: Uuid::new_v4(),
        patient_id,
        doctor_id: auth.user.id,
        medicines,
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };
    repository::insert_prescription(&conn, &prescription)?;

    tracing::info!(prescription_id = %prescription.id, "Prescription created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "prescription": prescription,
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
    let prescriptions = repository::list_prescriptions_by_patient(&conn, &patient_id)?;
    Ok(Json(json!({ "success": true, "prescriptions": prescriptions })))
}

pub async fn by_doctor(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, ApiError> {
    require_doctor(&auth)
        .map_err(|_| ApiError::Forbidden("Access denied".to_string()))?;
    let conn = ctx.core.lock_db()?;
    let prescriptions = repository::list_prescriptions_by_doctor(&conn, &auth.user.id)?;
    Ok(Json(json!({ "success": true, "prescriptions": prescriptions })))
}
