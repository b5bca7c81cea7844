//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, verifies the JWT, loads
//! the referenced user, and injects `AuthContext` into request
//! extensions for downstream handlers.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthContext};
use crate::db::repository;
use crate::models::enums::Role;
use crate::security;

/// Require a valid bearer token on every request that passes through.
///
/// Accesses `ApiContext` from request extensions (injected by the
/// Extension layer, which must be outermost).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("missing API context".into()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            ApiError::Unauthorized("No token provided, authorization denied".to_string())
        })?
        .to_string();

    let claims = security::verify_token(&token, &ctx.core.config.jwt_secret)?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))?;

    let user = {
        let conn = ctx.core.lock_db()?;
        repository::get_user(&conn, &user_id)?
    }
    .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    req.extensions_mut().insert(AuthContext { user });
    Ok(next.run(req).await)
}

// ── Role gates ──────────────────────────────────────────────
//
// Pure equality, no hierarchy. Handlers call these before any work.

pub fn require_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.user.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Access denied. Admin role required".to_string(),
        ))
    }
}

pub fn require_doctor(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.user.role == Role::Doctor {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Access denied. Doctor role required".to_string(),
        ))
    }
}

pub fn require_patient(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.user.role == Role::Patient {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Access denied. Patient role required".to_string(),
        ))
    }
}

pub fn require_admin_or_doctor(auth: &AuthContext) -> Result<(), ApiError> {
    if matches!(auth.user.role, Role::Admin | Role::Doctor) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Access denied. Admin or Doctor role required".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn auth_with_role(role: Role) -> AuthContext {
        AuthContext {
            user: crate::models::User {
                id: Uuid::new_v4(),
                name: "t".to_string(),
                email: "t@example.com".to_string(),
                password_hash: "x".to_string(),
                role,
                phone: None,
                address: None,
                speciality: None,
                hospital_id: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    #[test]
    fn role_gates_are_pure_equality() {
        let admin = auth_with_role(Role::Admin);
        let doctor = auth_with_role(Role::Doctor);
        let patient = auth_with_role(Role::Patient);

        assert!(require_admin(&admin).is_ok());
        assert!(require_admin(&doctor).is_err());

        assert!(require_doctor(&doctor).is_ok());
        assert!(require_doctor(&admin).is_err(), "No role hierarchy");

        assert!(require_patient(&patient).is_ok());
        assert!(require_patient(&admin).is_err());

        assert!(require_admin_or_doctor(&admin).is_ok());
        assert!(require_admin_or_doctor(&doctor).is_ok());
        assert!(require_admin_or_doctor(&patient).is_err());
    }
}
