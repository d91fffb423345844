//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub sources: CheckResult,
    pub notices: CheckResult,
    pub contacts: CheckResult,
    pub chat: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckResult {
    fn up(detail: impl Into<String>) -> Self {
        Self {
            status: "up".to_string(),
            detail: Some(detail.into()),
        }
    }

    fn down(detail: impl Into<String>) -> Self {
        Self {
            status: "down".to_string(),
            detail: Some(detail.into()),
        }
    }

    fn is_up(&self) -> bool {
        self.status == "up"
    }
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: kca_portal_common::VERSION,
    })
}

/// Readiness probe - fixture loaded and data directory writable
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let sources = if state.corpus.is_empty() {
        CheckResult::down("no reference snippets loaded")
    } else {
        CheckResult::up(format!("{} snippets", state.corpus.snippet_count()))
    };

    let notices = if state.notices.is_writable().await {
        CheckResult::up("writable")
    } else {
        CheckResult::down("data directory is not writable")
    };

    let contacts = if state.contacts.is_writable().await {
        CheckResult::up("writable")
    } else {
        CheckResult::down("data directory is not writable")
    };

    let chat = CheckResult::up(state.chat.model_name());

    let all_healthy = [&sources, &notices, &contacts, &chat]
        .iter()
        .all(|c| c.is_up());

    let status = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
            checks: HealthChecks {
                sources,
                notices,
                contacts,
                chat,
            },
        }),
    )
}
