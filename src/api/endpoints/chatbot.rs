//! Chatbot proxy endpoint.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthContext};
use crate::chatbot;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    message: Option<String>,
    conversation_id: Option<String>,
}

pub async fn send(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let message = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Message is required".to_string()))?
        .to_string();

    let conversation_id = req
        .conversation_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let system = chatbot::system_prompt(&auth.user.name, auth.user.role);
    let client = ctx.chatbot.clone();
    let reply = tokio::task::spawn_blocking(move || client.complete(&system, &message))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| {
            tracing::error!(error = %e, "Chatbot request failed");
            ApiError::ChatbotUnavailable
        })?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "message": reply,
            "conversationId": conversation_id,
        },
    })))
}
