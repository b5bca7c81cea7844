//! Health-condition flags and PDF document uploads.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthContext};
use crate::authorization::{check_access, Action};
use crate::db::repository;
use crate::models::enums::Role;
use crate::models::{ConditionFlags, HealthDocument};
use crate::uploads;

use super::users::parse_id;

pub async fn upsert_conditions(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Json(flags): Json<ConditionFlags>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if auth.user.role != Role::Patient {
        return Err(ApiError::Forbidden(
            "Only patients can update health conditions".to_string(),
        ));
    }

    let conn = ctx.core.lock_db()?;
    let (record, created) = repository::upsert_health_conditions(&conn, &auth.user.id, &flags)?;
    let (status, message) = if created {
        (StatusCode::CREATED, "Health conditions created successfully")
    } else {
        (StatusCode::OK, "Health conditions updated successfully")
    };
    Ok((
        status,
        Json(json!({
            "success": true,
            "message": message,
            "healthCondition": record,
        })),
    ))
}

pub async fn own_conditions(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let record = repository::get_health_by_user(&conn, &auth.user.id)?.ok_or_else(|| {
        ApiError::NotFound("Health conditions not found for this user".to_string())
    })?;
    Ok(Json(json!({ "success": true, "healthCondition": record })))
}

pub async fn patient_conditions(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !check_access(&auth.principal(), Action::ViewPatientHealth).allowed {
        return Err(ApiError::Forbidden(
            "Not authorized to access this data".to_string(),
        ));
    }
    let patient_id = parse_id(&id, "Health conditions not found for this patient")?;
    let conn = ctx.core.lock_db()?;
    let record = repository::get_health_by_user(&conn, &patient_id)?.ok_or_else(|| {
        ApiError::NotFound("Health conditions not found for this patient".to_string())
    })?;
    Ok(Json(json!({ "success": true, "healthCondition": record })))
}

pub async fn upload_document(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    if auth.user.role != Role::Patient {
        return Err(ApiError::Forbidden(
            "Only patients can upload documents".to_string(),
        ));
    }

    let mut description: Option<String> = None;
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let field_name = field.name().map(str::to_string);
        let filename = field.file_name().map(str::to_string);
        if let Some(filename) = filename {
            let content_type = field.content_type().map(|ct| ct.to_string());
            let bytes = field.bytes().await.map_err(|_| {
                ApiError::BadRequest("File too large. Maximum size is 10MB".to_string())
            })?;
            file = Some((filename, content_type, bytes.to_vec()));
        } else if field_name.as_deref() == Some("description") {
            description = field.text().await.ok();
        }
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("No document uploaded".to_string()))?;
    if !uploads::is_pdf(&filename, content_type.as_deref()) {
        return Err(ApiError::BadRequest("Only PDF files are allowed".to_string()));
    }
    if bytes.len() > uploads::MAX_DOCUMENT_BYTES {
        return Err(ApiError::BadRequest(
            "File too large. Maximum size is 10MB".to_string(),
        ));
    }

    let stored_name = uploads::store_document(&ctx.core.config.uploads_dir, &filename, &bytes)?;
    let document = HealthDocument {
        id: Uuid::new_v4(),
        filename,
        path: stored_name.clone(),
        upload_date: Utc::now(),
        description,
    };

    let insert_result = {
        let conn = ctx.core.lock_db()?;
        repository::insert_health_document(&conn, &auth.user.id, &document)
    };
    if let Err(e) = insert_result {
        // Do not leave an orphaned file behind when the record fails.
        uploads::remove_document(&ctx.core.config.uploads_dir, &stored_name);
        return Err(e.into());
    }

    tracing::info!(document_id = %document.id, user_id = %auth.user.id, "Document uploaded");
    Ok(Json(json!({
        "success": true,
        "message": "Document uploaded successfully",
        "document": document,
    })))
}

pub async fn list_documents(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let documents = repository::list_health_documents(&conn, &auth.user.id)?;
    if documents.is_empty() {
        return Err(ApiError::NotFound(
            "No documents found for this user".to_string(),
        ));
    }
    Ok(Json(json!({ "success": true, "documents": documents })))
}

pub async fn delete_document(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Path(document_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let document_id = parse_id(&document_id, "Document not found")?;
    let removed = {
        let conn = ctx.core.lock_db()?;
        repository::delete_health_document(&conn, &auth.user.id, &document_id)?
    }
    .ok_or_else(|| ApiError::NotFound("Document not found".to_string()))?;

    uploads::remove_document(&ctx.core.config.uploads_dir, &removed.path);
    Ok(Json(json!({
        "success": true,
        "message": "Document deleted successfully",
    })))
}
