//! Hospital management (admin) and hospital-doctor assignment.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::middleware::auth::require_admin;
use crate::api::types::{ApiContext, AuthContext};
use crate::db::repository;
use crate::models::enums::Role;
use crate::models::Hospital;

use super::users::parse_id;

#[derive(Deserialize)]
pub struct HospitalRequest {
    name: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<HospitalRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_admin(&auth)?;
    let name = req.name.as_deref().unwrap_or("").trim().to_string();
    let address = req.address.as_deref().unwrap_or("").trim().to_string();
    if name.is_empty() || address.is_empty() {
        return Err(ApiError::BadRequest(
            "Name and address are required".to_string(),
        ));
    }

    let now = Utc::now();
    let hospital = Hospital {
        id: Uuid::new_v4(),
        name,
        address,
        phone: req.phone,
        email: req.email,
        website: req.website,
        created_at: now,
        updated_at: now,
    };

    let conn = ctx.core.lock_db()?;
    repository::insert_hospital(&conn, &hospital)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Hospital created successfully",
            "hospital": hospital,
        })),
    ))
}

pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let hospitals = repository::list_hospitals(&conn)?;
    Ok(Json(json!({ "success": true, "hospitals": hospitals })))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let hospital_id = parse_id(&id, "Hospital not found")?;
    let conn = ctx.core.lock_db()?;
    let hospital = repository::get_hospital(&conn, &hospital_id)?
        .ok_or_else(|| ApiError::NotFound("Hospital not found".to_string()))?;
    Ok(Json(json!({ "success": true, "hospital": hospital })))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<HospitalRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth)?;
    let hospital_id = parse_id(&id, "Hospital not found")?;

    let conn = ctx.core.lock_db()?;
    let mut hospital = repository::get_hospital(&conn, &hospital_id)?
        .ok_or_else(|| ApiError::NotFound("Hospital not found".to_string()))?;

    if let Some(name) = req.name {
        hospital.name = name;
    }
    if let Some(address) = req.address {
        hospital.address = address;
    }
    if let Some(phone) = req.phone {
        hospital.phone = Some(phone);
    }
    if let Some(email) = req.email {
        hospital.email = Some(email);
    }
    if let Some(website) = req.website {
        hospital.website = Some(website);
    }
    repository::update_hospital(&conn, &hospital)?;

    let hospital = repository::get_hospital(&conn, &hospital_id)?
        .ok_or_else(|| ApiError::NotFound("Hospital not found".to_string()))?;
    Ok(Json(json!({
        "success": true,
        "message": "Hospital updated successfully",
        "hospital": hospital,
    })))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth)?;
    let hospital_id = parse_id(&id, "Hospital not found")?;

    let conn = ctx.core.lock_db()?;
    if repository::get_hospital(&conn, &hospital_id)?.is_none() {
        return Err(ApiError::NotFound("Hospital not found".to_string()));
    }
    if repository::count_doctors_in_hospital(&conn, &hospital_id)? > 0 {
        return Err(ApiError::BadRequest(
            "Cannot delete hospital with associated doctors. Reassign or delete doctors first."
                .to_string(),
        ));
    }
    repository::delete_hospital(&conn, &hospital_id)?;
    Ok(Json(json!({
        "success": true,
        "message": "Hospital deleted successfully",
    })))
}

pub async fn doctors(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let hospital_id = parse_id(&id, "Hospital not found")?;
    let conn = ctx.core.lock_db()?;
    if repository::get_hospital(&conn, &hospital_id)?.is_none() {
        return Err(ApiError::NotFound("Hospital not found".to_string()));
    }
    let doctors = repository::list_doctors_by_hospital(&conn, &hospital_id)?;
    Ok(Json(json!({ "success": true, "doctors": doctors })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDoctorRequest {
    doctor_id: Option<String>,
}

pub async fn add_doctor(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<AddDoctorRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth)?;
    let hospital_id = parse_id(&id, "Hospital not found")?;

    let doctor_raw = req
        .doctor_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Doctor ID is required".to_string()))?;
    let doctor_id = Uuid::parse_str(doctor_raw)
        .map_err(|_| ApiError::NotFound("User not found".to_string()))?;

    let conn = ctx.core.lock_db()?;
    if repository::get_hospital(&conn, &hospital_id)?.is_none() {
        return Err(ApiError::NotFound("Hospital not found".to_string()));
    }
    let user = repository::get_user(&conn, &doctor_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    if user.role != Role::Doctor {
        return Err(ApiError::BadRequest("User is not a doctor".to_string()));
    }

    repository::set_doctor_hospital(&conn, &doctor_id, &hospital_id)?;
    Ok(Json(json!({
        "success": true,
        "message": "Doctor added to hospital successfully",
    })))
}
