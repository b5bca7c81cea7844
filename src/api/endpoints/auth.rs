//! Registration and login.

use std::str::FromStr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::models::enums::Role;
use crate::models::User;
use crate::security;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    speciality: Option<String>,
    hospital_id: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

pub async fn register(
    State(ctx): State<ApiContext>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let name = req.name.as_deref().unwrap_or("").trim().to_string();
    let email = req
        .email
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let password = req.password.unwrap_or_default();
    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest(
            "Name, email, and password are required".to_string(),
        ));
    }
    if password.len() < 6 {
        return Err(ApiError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let role = match req.role.as_deref() {
        None | Some("") => Role::Patient,
        Some(value) => {
            Role::from_str(value).map_err(|_| ApiError::BadRequest("Invalid role value".to_string()))?
        }
    };

    let (speciality, hospital_id) = if role == Role::Doctor {
        let speciality = req
            .speciality
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let hospital_raw = req
            .hospital_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        match (speciality, hospital_raw) {
            (Some(speciality), Some(raw)) => {
                let hospital_id = Uuid::parse_str(raw)
                    .map_err(|_| ApiError::BadRequest("Invalid hospital ID".to_string()))?;
                (Some(speciality.to_string()), Some(hospital_id))
            }
            _ => {
                return Err(ApiError::BadRequest(
                    "Speciality and hospital ID are required for doctors".to_string(),
                ))
            }
        }
    } else {
        (None, None)
    };

    let password_hash = tokio::task::spawn_blocking(move || security::hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash,
        role,
        phone: req.phone,
        address: req.address,
        speciality,
        hospital_id,
        created_at: now,
        updated_at: now,
    };

    {
        let conn = ctx.core.lock_db()?;
        if repository::get_user_by_email(&conn, &user.email)?.is_some() {
            return Err(ApiError::BadRequest("Email already exists".to_string()));
        }
        repository::insert_user(&conn, &user).map_err(|e| {
            if e.is_unique_violation() {
                ApiError::BadRequest("Email already exists".to_string())
            } else {
                e.into()
            }
        })?;
    }

    let token = security::issue_token(
        &user.id,
        user.role,
        &ctx.core.config.jwt_secret,
        ctx.core.config.token_ttl_secs,
    )?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "token": token,
            "user": user,
        })),
    ))
}

pub async fn login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let email = req.email.as_deref().unwrap_or("").trim().to_lowercase();
    let password = req.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let user = {
        let conn = ctx.core.lock_db()?;
        repository::get_user_by_email(&conn, &email)?
    }
    .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let stored = user.password_hash.clone();
    let matches =
        tokio::task::spawn_blocking(move || security::verify_password(&password, &stored))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;
    if !matches {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = security::issue_token(
        &user.id,
        user.role,
        &ctx.core.config.jwt_secret,
        ctx.core.config.token_ttl_secs,
    )?;

    tracing::debug!(user_id = %user.id, "Login successful");
    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Login successful",
            "token": token,
            "user": user,
        })),
    ))
}
