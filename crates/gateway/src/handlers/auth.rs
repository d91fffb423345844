//! Staff login

use axum::{extract::State, Json};

use crate::AppState;
use kca_portal_common::{
    auth::{IssuedToken, LoginRequest},
    errors::Result,
};

/// Exchange the staff credentials for a session token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<IssuedToken>> {
    if let Err(e) = state.staff.verify(&request) {
        tracing::warn!(username = %request.username, "Login rejected");
        return Err(e);
    }

    let issued = state.jwt.generate_token(request.username.trim())?;

    tracing::info!(
        username = %request.username,
        session_id = %issued.session_id,
        expires_at = %issued.expires_at,
        "Staff login"
    );

    Ok(Json(issued))
}
