//! Reference source handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use kca_portal_common::{
    auth::AuthContext,
    citations::{Citation, Source, DEFAULT_MAX_RESULTS},
    errors::Result,
};

#[derive(Serialize)]
pub struct SourcesResponse {
    pub sources: Vec<Source>,
    pub total: usize,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(min = 1, max = 1000, message = "Query must be 1-1000 characters"))]
    pub q: String,

    #[validate(range(min = 1, max = 20, message = "Limit must be 1-20"))]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub citations: Vec<Citation>,
}

/// List the reference sources
pub async fn list_sources(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Json<SourcesResponse> {
    let sources = state.corpus.sources().to_vec();
    Json(SourcesResponse {
        total: sources.len(),
        sources,
    })
}

/// Run the citation scorer directly
pub async fn search_sources(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    params.validate()?;

    let limit = params.limit.unwrap_or(DEFAULT_MAX_RESULTS);
    let citations = state.corpus.find_relevant_sources(&params.q, limit);

    tracing::info!(
        query_length = params.q.chars().count(),
        limit,
        results = citations.len(),
        "Source search"
    );

    Ok(Json(SearchResponse {
        query: params.q,
        citations,
    }))
}
