//! Chat assistant handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::AppState;
use kca_portal_common::{
    auth::AuthContext,
    chat::{ChatRequest, ChatResponse, ChatSession},
    errors::Result,
};

/// Answer one chat turn with citations
pub async fn chat(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    tracing::debug!(request_id = %auth.request_id, user = %auth.username, "Chat turn");
    let response = state.chat.respond(request).await?;
    Ok(Json(response))
}

/// Open a transcript seeded with the welcome message
pub async fn create_session(
    State(state): State<AppState>,
    auth: AuthContext,
) -> (StatusCode, Json<ChatSession>) {
    let session = state.chat.start_session().await;

    tracing::info!(
        session_id = %session.id,
        user = %auth.username,
        "Chat session created"
    );

    (StatusCode::CREATED, Json(session))
}

/// Get a chat transcript
pub async fn get_session(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ChatSession>> {
    Ok(Json(state.chat.transcript(session_id).await?))
}

/// Reset a chat transcript
pub async fn delete_session(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.chat.reset(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
