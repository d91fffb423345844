//! Chat-completion client abstraction
//!
//! Provides a unified interface for answering a prompt:
//! - OpenAI-compatible `/chat/completions` endpoints
//! - An offline completer used when no API key is configured

use crate::citations::Citation;
use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Answer used when the upstream returns no choices
pub const FALLBACK_ANSWER: &str = "죄송합니다. 답변을 생성할 수 없습니다.";

/// Everything a completer needs to answer one chat turn
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub citations: Vec<Citation>,
}

/// Trait for chat-completion providers
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    /// Produce the assistant answer for a single turn
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat-completion client
pub struct OpenAIChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAIChatClient {
    /// Create a new client from configuration
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout,
        })
    }

    fn body<'a>(&'a self, request: &CompletionRequest) -> ChatCompletionBody<'a> {
        ChatCompletionBody {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user_message.clone(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        }
    }
}

#[async_trait]
impl ChatCompleter for OpenAIChatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::ChatCompletionTimeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    AppError::ChatCompletion {
                        message: format!("Request failed: {}", e),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ChatCompletion {
                message: format!("OpenAI API error {}: {}", status, body),
            });
        }

        let result: ChatCompletionResponse =
            response.json().await.map_err(|e| AppError::ChatCompletion {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(first_answer(result))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn first_answer(response: ChatCompletionResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_ANSWER.to_string())
}

/// Deterministic completer that answers from the citations alone
pub struct OfflineChatCompleter;

#[async_trait]
impl ChatCompleter for OfflineChatCompleter {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let question = request.user_message.trim();

        if request.citations.is_empty() {
            return Ok(format!(
                "'{}'에 대한 근거 자료를 찾지 못했습니다. 담당 부서에 확인 필요합니다.",
                question
            ));
        }

        let mut answer = format!("'{}'에 대한 관련 근거 자료입니다.\n", question);
        for (i, citation) in request.citations.iter().enumerate() {
            answer.push_str(&format!(
                "\n{}. [{}] {}",
                i + 1,
                citation.title,
                citation.snippet
            ));
        }
        answer.push_str("\n\n세부 내용은 원문을 확인해주세요.");
        Ok(answer)
    }

    fn model_name(&self) -> &str {
        "offline"
    }
}

/// Create a completer based on configuration
pub fn create_completer(config: &LlmConfig) -> Result<Arc<dyn ChatCompleter>> {
    match config.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            tracing::info!(model = %config.model, base_url = %config.api_base, "Using OpenAI chat completions");
            Ok(Arc::new(OpenAIChatClient::new(key.to_string(), config)?))
        }
        _ => {
            tracing::warn!("No LLM API key configured, using offline completer");
            Ok(Arc::new(OfflineChatCompleter))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(citations: Vec<Citation>) -> CompletionRequest {
        CompletionRequest {
            system_prompt: "system".into(),
            user_message: "환불 규정 알려줘".into(),
            citations,
        }
    }

    #[tokio::test]
    async fn test_offline_without_citations() {
        let answer = OfflineChatCompleter.complete(&request(vec![])).await.unwrap();
        assert!(answer.contains("확인 필요"));
    }

    #[tokio::test]
    async fn test_offline_lists_citations() {
        let citations = vec![Citation {
            title: "응시수수료 환불규정".into(),
            source_id: "refund-policy".into(),
            snippet: "접수기간 중 취소 시 전액 환불됩니다.".into(),
            url: None,
        }];
        let answer = OfflineChatCompleter.complete(&request(citations)).await.unwrap();
        assert!(answer.contains("1. [응시수수료 환불규정]"));
    }

    #[test]
    fn test_request_body() {
        let client = OpenAIChatClient::new("sk-test".into(), &LlmConfig::default()).unwrap();
        let body = serde_json::to_value(client.body(&request(vec![]))).unwrap();

        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["max_tokens"], 800);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "환불 규정 알려줘");
    }

    #[test]
    fn test_empty_choices_fall_back() {
        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(first_answer(empty), FALLBACK_ANSWER);

        let blank: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap();
        assert_eq!(first_answer(blank), FALLBACK_ANSWER);

        let ok: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":"답변"}}]}"#)
                .unwrap();
        assert_eq!(first_answer(ok), "답변");
    }

    #[test]
    fn test_factory_picks_offline_without_key() {
        let completer = create_completer(&LlmConfig::default()).unwrap();
        assert_eq!(completer.model_name(), "offline");

        let config = LlmConfig {
            api_key: Some("sk-test".into()),
            ..LlmConfig::default()
        };
        let completer = create_completer(&config).unwrap();
        assert_eq!(completer.model_name(), "gpt-3.5-turbo");
    }
}
