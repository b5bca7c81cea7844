//! Doctor directory and per-doctor appointment listing.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthContext};
use crate::authorization::{check_access, Action};
use crate::db::repository;
use crate::models::enums::Role;

use super::users::parse_id;

pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let doctors = repository::list_doctors(&conn)?;
    Ok(Json(json!({ "success": true, "doctors": doctors })))
}

pub async fn by_speciality(
    State(ctx): State<ApiContext>,
    Path(speciality): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let doctors = repository::list_doctors_by_speciality(&conn, &speciality)?;
    Ok(Json(json!({ "success": true, "doctors": doctors })))
}

pub async fn specialities(State(ctx): State<ApiContext>) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let specialities = repository::list_specialities(&conn)?;
    Ok(Json(json!({ "success": true, "specialities": specialities })))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let doctor_id = parse_id(&id, "Doctor not found")?;
    let conn = ctx.core.lock_db()?;
    let doctor = repository::get_user(&conn, &doctor_id)?
        .filter(|user| user.role == Role::Doctor)
        .ok_or_else(|| ApiError::NotFound("Doctor not found".to_string()))?;
    Ok(Json(json!({ "success": true, "doctor": doctor })))
}

pub async fn appointments(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let doctor_id = parse_id(&id, "Doctor not found")?;
    if !check_access(&auth.principal(), Action::ViewDoctorAppointments { doctor_id }).allowed {
        return Err(ApiError::Forbidden(
            "Not authorized to access these appointments".to_string(),
        ));
    }
    let conn = ctx.core.lock_db()?;
    let appointments = repository::list_appointments_by_doctor(&conn, &doctor_id)?;
    Ok(Json(json!({ "success": true, "appointments": appointments })))
}
