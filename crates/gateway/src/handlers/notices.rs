//! Notice board handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::AppState;
use kca_portal_common::{
    auth::AuthContext,
    errors::Result,
    notices::{Notice, NoticeDraft, NoticePage, NoticeQuery, RECENT_LIMIT},
};

#[derive(Serialize)]
pub struct NoticeListResponse {
    pub notices: Vec<Notice>,
}

/// List notices with filters and pagination
pub async fn list_notices(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(query): Query<NoticeQuery>,
) -> Result<Json<NoticePage>> {
    Ok(Json(state.notices.list(&query).await?))
}

pub async fn recent_notices(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Json<NoticeListResponse> {
    Json(NoticeListResponse {
        notices: state.notices.recent(RECENT_LIMIT).await,
    })
}

pub async fn ticker(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Json<NoticeListResponse> {
    Json(NoticeListResponse {
        notices: state.notices.ticker().await,
    })
}

/// Read a notice; counts a view
pub async fn get_notice(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<u64>,
) -> Result<Json<Notice>> {
    Ok(Json(state.notices.get(id).await?))
}

pub async fn create_notice(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(draft): Json<NoticeDraft>,
) -> Result<(StatusCode, Json<Notice>)> {
    let notice = state.notices.create(draft).await?;
    tracing::info!(notice_id = notice.id, user = %auth.username, "Notice posted");
    Ok((StatusCode::CREATED, Json(notice)))
}

pub async fn update_notice(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<u64>,
    Json(draft): Json<NoticeDraft>,
) -> Result<Json<Notice>> {
    let notice = state.notices.update(id, draft).await?;
    tracing::info!(notice_id = id, user = %auth.username, "Notice edited");
    Ok(Json(notice))
}

pub async fn toggle_publish(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<u64>,
) -> Result<Json<Notice>> {
    let notice = state.notices.toggle_publish(id).await?;
    tracing::info!(
        notice_id = id,
        published = notice.is_published,
        user = %auth.username,
        "Notice visibility changed"
    );
    Ok(Json(notice))
}

pub async fn delete_notice(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    state.notices.delete(id).await?;
    tracing::info!(notice_id = id, user = %auth.username, "Notice removed");
    Ok(StatusCode::NO_CONTENT)
}
