//! User listing, profiles, and account management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::middleware::auth::require_admin;
use crate::api::types::{ApiContext, AuthContext};
use crate::authorization::{check_access, Action};
use crate::db::repository;
use crate::models::enums::Role;

/// Parse a path id; an unparseable id can never match a record.
pub(super) fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(not_found.to_string()))
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&auth)?;
    let conn = ctx.core.lock_db()?;
    let users = repository::list_users(&conn)?;
    Ok(Json(json!({ "success": true, "users": users })))
}

pub async fn profile(
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({ "success": true, "user": auth.user })))
}

pub async fn doctors_all(State(ctx): State<ApiContext>) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let doctors = repository::list_doctors(&conn)?;
    Ok(Json(json!({ "success": true, "doctors": doctors })))
}

pub async fn doctors_by_hospital(
    State(ctx): State<ApiContext>,
    Path(hospital_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let hospital_id = parse_id(&hospital_id, "Hospital not found")?;
    let conn = ctx.core.lock_db()?;
    let doctors = repository::list_doctors_by_hospital(&conn, &hospital_id)?;
    Ok(Json(json!({ "success": true, "doctors": doctors })))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let target_id = parse_id(&id, "User not found")?;
    if !check_access(&auth.principal(), Action::ViewUser { target_id }).allowed {
        return Err(ApiError::Forbidden(
            "Not authorized to access this user data".to_string(),
        ));
    }
    let conn = ctx.core.lock_db()?;
    let user = repository::get_user(&conn, &target_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(json!({ "success": true, "user": user })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    speciality: Option<String>,
    hospital_id: Option<String>,
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let target_id = parse_id(&id, "User not found")?;
    if !check_access(&auth.principal(), Action::ModifyUser { target_id }).allowed {
        return Err(ApiError::Forbidden(
            "Not authorized to update this user data".to_string(),
        ));
    }

    let conn = ctx.core.lock_db()?;
    let mut user = repository::get_user(&conn, &target_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if let Some(name) = req.name {
        user.name = name;
    }
    if let Some(email) = req.email {
        user.email = email.trim().to_lowercase();
    }
    if let Some(phone) = req.phone {
        user.phone = Some(phone);
    }
    if let Some(address) = req.address {
        user.address = Some(address);
    }
    // Clinical fields only apply to doctor accounts; role itself is
    // never updatable.
    if user.role == Role::Doctor {
        if let Some(speciality) = req.speciality {
            user.speciality = Some(speciality);
        }
        if let Some(raw) = req.hospital_id {
            let hospital_id = Uuid::parse_str(raw.trim())
                .map_err(|_| ApiError::BadRequest("Invalid hospital ID".to_string()))?;
            user.hospital_id = Some(hospital_id);
        }
    }

    repository::update_user(&conn, &user).map_err(|e| {
        if e.is_unique_violation() {
            ApiError::BadRequest("Email already exists".to_string())
        } else {
            e.into()
        }
    })?;

    let user = repository::get_user(&conn, &target_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "User updated successfully",
            "user": user,
        })),
    ))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let target_id = parse_id(&id, "User not found")?;
    if !check_access(&auth.principal(), Action::ModifyUser { target_id }).allowed {
        return Err(ApiError::Forbidden(
            "Not authorized to delete this user data".to_string(),
        ));
    }
    let conn = ctx.core.lock_db()?;
    if !repository::delete_user(&conn, &target_id)? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    tracing::info!(user_id = %target_id, "User deleted");
    Ok(Json(json!({
        "success": true,
        "message": "User deleted successfully",
    })))
}
