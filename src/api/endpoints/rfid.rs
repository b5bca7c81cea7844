//! RFID card assignment and patient lookup.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::middleware::auth::{require_admin, require_admin_or_doctor};
use crate::api::types::{ApiContext, AuthContext};
use crate::db::repository;
use crate::models::enums::Role;
use crate::models::RfidAssignment;

use super::users::parse_id;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    rfid_number: Option<String>,
    user_id: Option<String>,
}

pub async fn assign(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AssignRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_admin_or_doctor(&auth)?;

    let rfid_number = req.rfid_number.as_deref().unwrap_or("").trim().to_string();
    let user_raw = req.user_id.as_deref().unwrap_or("").trim().to_string();
    if rfid_number.is_empty() || user_raw.is_empty() {
        return Err(ApiError::BadRequest(
            "RFID number and User ID are required".to_string(),
        ));
    }
    let user_id = Uuid::parse_str(&user_raw)
        .map_err(|_| ApiError::NotFound("User not found".to_string()))?;

    let conn = ctx.core.lock_db()?;
    if repository::rfid_number_exists(&conn, &rfid_number)? {
        return Err(ApiError::BadRequest(
            "RFID card is already assigned".to_string(),
        ));
    }
    let user = repository::get_user(&conn, &user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    if user.role != Role::Patient {
        return Err(ApiError::BadRequest(
            "RFID cards can only be assigned to patients".to_string(),
        ));
    }
    if repository::get_rfid_by_user(&conn, &user_id)?.is_some() {
        return Err(ApiError::BadRequest(
            "User already has an RFID card assigned".to_string(),
        ));
    }

    let now = Utc::now();
    let assignment = RfidAssignment {
        id: Uuid::new_v4(),
        rfid_number,
        user_id,
        is_active: true,
        assigned_by: auth.user.id,
        created_at: now,
        updated_at: now,
    };
    repository::insert_rfid(&conn, &assignment).map_err(|e| {
        if e.is_unique_violation() {
            ApiError::BadRequest("RFID card is already assigned".to_string())
        } else {
            e.into()
        }
    })?;

    tracing::info!(rfid_id = %assignment.id, user_id = %user_id, "RFID card assigned");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "RFID card assigned successfully",
            "rfidAssignment": assignment,
        })),
    ))
}

/// Resolve an active card number to its patient.
pub async fn lookup_user(
    State(ctx): State<ApiContext>,
    Path(rfid_number): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let assignment = repository::get_active_rfid_by_number(&conn, rfid_number.trim())?
        .ok_or_else(|| ApiError::NotFound("RFID card not found".to_string()))?;
    let user = repository::get_user(&conn, &assignment.user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(json!({ "success": true, "user": user })))
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth)?;
    let conn = ctx.core.lock_db()?;
    let assignments = repository::list_rfid_assignments(&conn)?;
    Ok(Json(json!({ "success": true, "rfidAssignments": assignments })))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let rfid_id = parse_id(&id, "RFID assignment not found")?;
    let conn = ctx.core.lock_db()?;
    let assignment = repository::get_rfid(&conn, &rfid_id)?
        .ok_or_else(|| ApiError::NotFound("RFID assignment not found".to_string()))?;
    Ok(Json(json!({ "success": true, "rfidAssignment": assignment })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    rfid_number: Option<String>,
    user_id: Option<String>,
    is_active: Option<bool>,
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin_or_doctor(&auth)?;
    let rfid_id = parse_id(&id, "RFID assignment not found")?;

    let conn = ctx.core.lock_db()?;
    let mut assignment = repository::get_rfid(&conn, &rfid_id)?
        .ok_or_else(|| ApiError::NotFound("RFID assignment not found".to_string()))?;

    if let Some(number) = req.rfid_number {
        let number = number.trim().to_string();
        if !number.is_empty() && number != assignment.rfid_number {
            if repository::rfid_number_exists(&conn, &number)? {
                return Err(ApiError::BadRequest(
                    "RFID number is already in use".to_string(),
                ));
            }
            assignment.rfid_number = number;
        }
    }
    if let Some(user_raw) = req.user_id {
        let user_id = Uuid::parse_str(user_raw.trim())
            .map_err(|_| ApiError::NotFound("User not found".to_string()))?;
        if user_id != assignment.user_id {
            let user = repository::get_user(&conn, &user_id)?
                .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
            if user.role != Role::Patient {
                return Err(ApiError::BadRequest(
                    "RFID cards can only be assigned to patients".to_string(),
                ));
            }
            assignment.user_id = user_id;
        }
    }
    if let Some(is_active) = req.is_active {
        assignment.is_active = is_active;
    }
    assignment.assigned_by = auth.user.id;

    repository::update_rfid(&conn, &assignment)?;
    let assignment = repository::get_rfid(&conn, &rfid_id)?
        .ok_or_else(|| ApiError::NotFound("RFID assignment not found".to_string()))?;
    Ok(Json(json!({
        "success": true,
        "message": "RFID assignment updated successfully",
        "rfidAssignment": assignment,
    })))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth)?;
    let rfid_id = parse_id(&id, "RFID assignment not found")?;
    let conn = ctx.core.lock_db()?;
    if !repository::delete_rfid(&conn, &rfid_id)? {
        return Err(ApiError::NotFound("RFID assignment not found".to_string()));
    }
    Ok(Json(json!({
        "success": true,
        "message": "RFID assignment deleted successfully",
    })))
}
