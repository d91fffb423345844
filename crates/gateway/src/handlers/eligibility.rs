//! Eligibility self-assessment handlers

use axum::Json;
use serde::Serialize;

use kca_portal_common::{
    auth::AuthContext,
    eligibility::{
        assess, diagnose, Assessment, AssessmentRequest, Diagnosis, DiagnosisRequest, Question,
        QUESTIONS,
    },
    errors::Result,
};

#[derive(Serialize)]
pub struct QuestionsResponse {
    pub questions: &'static [Question],
}

pub async fn questions(_auth: AuthContext) -> Json<QuestionsResponse> {
    Json(QuestionsResponse {
        questions: QUESTIONS,
    })
}

/// Score the five-question quick check
pub async fn assess_answers(
    auth: AuthContext,
    Json(mut request): Json<AssessmentRequest>,
) -> Result<Json<Assessment>> {
    request
        .session_id
        .get_or_insert_with(|| auth.session_id.to_string());
    Ok(Json(assess(&request)?))
}

/// Qualification diagnosis from education and work history
pub async fn diagnose_history(
    auth: AuthContext,
    Json(mut request): Json<DiagnosisRequest>,
) -> Json<Diagnosis> {
    request
        .session_id
        .get_or_insert_with(|| auth.session_id.to_string());
    Json(diagnose(&request))
}
