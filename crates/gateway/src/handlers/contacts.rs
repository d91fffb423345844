//! Contact directory handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::AppState;
use kca_portal_common::{
    auth::AuthContext,
    contacts::{Contact, ContactDraft, ContactQuery},
    errors::Result,
    interactions::{log_interaction, InteractionType},
};

#[derive(Serialize)]
pub struct ContactsResponse {
    pub contacts: Vec<Contact>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct DepartmentsResponse {
    pub departments: Vec<String>,
}

/// List contacts with optional text, department and sort filters
pub async fn list_contacts(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(query): Query<ContactQuery>,
) -> Json<ContactsResponse> {
    let contacts = state.contacts.list(&query).await;
    Json(ContactsResponse {
        total: contacts.len(),
        contacts,
    })
}

pub async fn list_departments(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Json<DepartmentsResponse> {
    Json(DepartmentsResponse {
        departments: state.contacts.departments().await,
    })
}

pub async fn get_contact(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<u64>,
) -> Result<Json<Contact>> {
    let contact = state.contacts.get(id).await?;
    log_interaction(
        InteractionType::ContactView,
        Some(&auth.session_id.to_string()),
        Some(json!({ "contactId": contact.id, "department": contact.department })),
    );
    Ok(Json(contact))
}

pub async fn create_contact(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(draft): Json<ContactDraft>,
) -> Result<(StatusCode, Json<Contact>)> {
    let contact = state.contacts.create(draft).await?;
    tracing::info!(contact_id = contact.id, user = %auth.username, "Contact added");
    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn update_contact(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<u64>,
    Json(draft): Json<ContactDraft>,
) -> Result<Json<Contact>> {
    let contact = state.contacts.update(id, draft).await?;
    tracing::info!(contact_id = id, user = %auth.username, "Contact replaced");
    Ok(Json(contact))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    state.contacts.delete(id).await?;
    tracing::info!(contact_id = id, user = %auth.username, "Contact removed");
    Ok(StatusCode::NO_CONTENT)
}
