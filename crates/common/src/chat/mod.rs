//! KCA assistant chat
//!
//! A chat turn retrieves citations for the question, sends the question with
//! the citations to the configured completer and, when the caller keeps a
//! session, appends both messages to the server-side transcript.

mod session;

pub use session::{ChatSession, ChatSessionStore};

use crate::citations::{Citation, SourceCorpus};
use crate::errors::{AppError, Result};
use crate::interactions::{log_interaction, InteractionType};
use crate::llm::{ChatCompleter, CompletionRequest};
use crate::metrics::record_completion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

pub const MAX_MESSAGE_CHARS: usize = 1000;

pub const SYSTEM_PROMPT: &str = "당신은 KCA 자격검정 업무도우미입니다.

역할: KCA 자격검정 담당자를 위한 업무 지원 도우미

답변 원칙:
1. KCA 법/고시/공식문서에 근거한 답변을 우선 제공
2. 불확실한 정보는 '확인 필요'로 명시
3. 민감정보 수집 금지
4. 특정인 신상 추정 금지

답변 형식:
1. 간결 요약 (핵심 정보)
2. 상세 설명 (구체적인 업무 절차)
3. 관련 근거 (제공된 근거 자료 기반)
4. 다음 행동 제안 (업무 처리 방법 등)

답변은 한국어로 제공하며, KCA 공식적이고 신뢰할 수 있는 정보를 제공해야 합니다.";

pub const WELCOME_MESSAGE: &str = "안녕하세요! KCA 자격검정 업무도우미입니다.

📋 **제공 서비스**
• KCA 자격검정 제도 안내
• 업무 절차 및 가이드라인
• 시험 운영 관련 문의
• 자격증 발급 및 관리

💡 **예시 질문**
• \"필기시험 접수기간과 환불규정 알려줘\"
• \"시험 감독 업무 절차는 어떻게 되나요?\"
• \"자격증 발급 신청 방법을 알려주세요\"
• \"응시자격 심사 기준은 무엇인가요?\"

모든 답변은 KCA 공식 문서에 근거하여 제공됩니다.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            citations: None,
        }
    }

    pub fn assistant(content: impl Into<String>, citations: Option<Vec<Citation>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            citations,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "메시지는 1자 이상 1000자 이내로 입력해주세요"
    ))]
    pub message: String,
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

/// System prompt with the retrieved citations appended as reference material
pub fn build_system_prompt(citations: &[Citation]) -> String {
    if citations.is_empty() {
        return SYSTEM_PROMPT.to_string();
    }

    let mut prompt = String::from(SYSTEM_PROMPT);
    prompt.push_str("\n\n근거 자료:");
    for (i, citation) in citations.iter().enumerate() {
        prompt.push_str(&format!("\n[{}] {}: {}", i + 1, citation.title, citation.snippet));
    }
    prompt
}

pub struct ChatService {
    corpus: Arc<SourceCorpus>,
    completer: Arc<dyn ChatCompleter>,
    sessions: Arc<ChatSessionStore>,
    max_citations: usize,
}

impl ChatService {
    pub fn new(
        corpus: Arc<SourceCorpus>,
        completer: Arc<dyn ChatCompleter>,
        sessions: Arc<ChatSessionStore>,
        max_citations: usize,
    ) -> Self {
        Self {
            corpus,
            completer,
            sessions,
            max_citations,
        }
    }

    pub fn sessions(&self) -> &ChatSessionStore {
        &self.sessions
    }

    pub fn model_name(&self) -> &str {
        self.completer.model_name()
    }

    /// Open a new transcript seeded with the welcome message
    pub async fn start_session(&self) -> ChatSession {
        let session = self.sessions.open().await;
        log_interaction(
            InteractionType::ChatStart,
            Some(&session.id.to_string()),
            None,
        );
        session
    }

    /// Answer one chat turn
    #[instrument(skip(self, request), fields(session_id = ?request.session_id))]
    pub async fn respond(&self, request: ChatRequest) -> Result<ChatResponse> {
        let request = ChatRequest {
            message: request.message.trim().to_string(),
            ..request
        };
        request.validate()?;

        let message_chars = request.message.chars().count();
        info!(message_length = message_chars, "Chat request received");

        let user_message = ChatMessage::user(request.message.clone());
        log_interaction(
            InteractionType::ChatMessage,
            request.session_id.map(|id| id.to_string()).as_deref(),
            Some(json!({
                "messageId": user_message.id,
                "messageLength": message_chars,
            })),
        );

        let citations = self
            .corpus
            .find_relevant_sources(&request.message, self.max_citations);

        let completion = CompletionRequest {
            system_prompt: build_system_prompt(&citations),
            user_message: request.message.clone(),
            citations: citations.clone(),
        };

        let start = Instant::now();
        let answer = match self.completer.complete(&completion).await {
            Ok(answer) => answer,
            Err(e) => {
                record_completion(
                    start.elapsed().as_secs_f64(),
                    self.completer.model_name(),
                    0,
                    false,
                );
                warn!(error = %e, "Chat completion failed");
                return Err(e);
            }
        };
        let latency = start.elapsed();
        record_completion(
            latency.as_secs_f64(),
            self.completer.model_name(),
            citations.len(),
            true,
        );

        if let Some(session_id) = request.session_id {
            let assistant = ChatMessage::assistant(answer.clone(), Some(citations.clone()));
            self.sessions
                .append(session_id, vec![user_message, assistant])
                .await;
        }

        info!(
            response_length = answer.chars().count(),
            citations_count = citations.len(),
            latency_ms = latency.as_millis() as u64,
            model = self.completer.model_name(),
            "Chat response sent"
        );

        Ok(ChatResponse {
            answer,
            citations,
            session_id: request.session_id,
        })
    }

    pub async fn transcript(&self, id: Uuid) -> Result<ChatSession> {
        self.sessions
            .get(id)
            .await
            .ok_or_else(|| AppError::SessionNotFound { id: id.to_string() })
    }

    pub async fn reset(&self, id: Uuid) -> Result<()> {
        if self.sessions.remove(id).await {
            info!(session_id = %id, "Chat session reset");
            Ok(())
        } else {
            Err(AppError::SessionNotFound { id: id.to_string() })
        }
    }
}
