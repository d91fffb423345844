//! User interaction events
//!
//! Interactions are emitted as structured `tracing` events under the
//! `interactions` target. Payloads are scrubbed of personal data first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Replacement for redacted values
pub const REDACTED: &str = "[REDACTED]";

/// Keys whose values never reach the logs
pub const SENSITIVE_FIELDS: &[&str] = &["email", "phone", "password", "ssn", "address"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    ChatStart,
    ChatMessage,
    EligibilityStart,
    EligibilityComplete,
    EligibilityDiagnosisStart,
    EligibilityDiagnosisComplete,
    ContactView,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::ChatStart => "chat_start",
            InteractionType::ChatMessage => "chat_message",
            InteractionType::EligibilityStart => "eligibility_start",
            InteractionType::EligibilityComplete => "eligibility_complete",
            InteractionType::EligibilityDiagnosisStart => "eligibility_diagnosis_start",
            InteractionType::EligibilityDiagnosisComplete => "eligibility_diagnosis_complete",
            InteractionType::ContactView => "contact_view",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInteraction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl UserInteraction {
    /// Build an interaction; `data` is redacted on the way in
    pub fn new(kind: InteractionType, session_id: Option<&str>, data: Option<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            session_id: session_id.map(str::to_string),
            timestamp: Utc::now(),
            data: data.map(redact_pii),
        }
    }
}

/// Record a user interaction and return it
pub fn log_interaction(
    kind: InteractionType,
    session_id: Option<&str>,
    data: Option<Value>,
) -> UserInteraction {
    let interaction = UserInteraction::new(kind, session_id, data);
    let data = interaction
        .data
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_default();

    tracing::info!(
        target: "interactions",
        interaction_id = %interaction.id,
        interaction_type = kind.as_str(),
        session_id = interaction.session_id.as_deref().unwrap_or("-"),
        data = %data,
        "User interaction: {}",
        kind.as_str()
    );

    interaction
}

/// Replace sensitive keys with [`REDACTED`] at any depth
pub fn redact_pii(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    if SENSITIVE_FIELDS.contains(&key.to_ascii_lowercase().as_str()) {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, redact_pii(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact_pii).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redacts_nested_fields() {
        let redacted = redact_pii(json!({
            "name": "김자격",
            "email": "qualification@kca.kr",
            "contact": { "Phone": "02-1234-5678", "office": "본관 3층" },
            "history": [{ "address": "서울" }, { "ssn": "000000-0000000" }]
        }));

        assert_eq!(redacted["name"], "김자격");
        assert_eq!(redacted["email"], REDACTED);
        assert_eq!(redacted["contact"]["Phone"], REDACTED);
        assert_eq!(redacted["contact"]["office"], "본관 3층");
        assert_eq!(redacted["history"][0]["address"], REDACTED);
        assert_eq!(redacted["history"][1]["ssn"], REDACTED);
    }

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(redact_pii(json!("email")), json!("email"));
        assert_eq!(redact_pii(json!(42)), json!(42));
    }

    #[test]
    fn test_interaction_shape() {
        let interaction = log_interaction(
            InteractionType::ContactView,
            Some("session-1"),
            Some(json!({ "contactId": 3, "email": "result@kca.kr" })),
        );

        let json = serde_json::to_value(&interaction).unwrap();
        assert_eq!(json["type"], "contact_view");
        assert_eq!(json["sessionId"], "session-1");
        assert_eq!(json["data"]["contactId"], 3);
        assert_eq!(json["data"]["email"], REDACTED);
    }

    #[test]
    fn test_type_names_match_serde() {
        for kind in [
            InteractionType::ChatStart,
            InteractionType::EligibilityDiagnosisComplete,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
    }
}
