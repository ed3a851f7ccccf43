//! 채팅 모델 모듈 - Mistral chat completions 호출
//!
//! 조립된 프롬프트를 호스팅된 채팅 API로 보내고 생성된 텍스트를 돌려받습니다.
//! 재시도나 백오프는 하지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::{RagError, Result};

// ============================================================================
// Messages
// ============================================================================

/// 대화 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// 채팅 메시지
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

// ============================================================================
// ChatModel Trait
// ============================================================================

/// 채팅 모델 트레이트
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// 메시지 목록을 보내고 첫 번째 응답 텍스트를 반환
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;

    /// 모델 이름
    fn model(&self) -> &str;
}

// ============================================================================
// Mistral Client
// ============================================================================

/// Mistral chat completions 클라이언트
#[derive(Debug)]
pub struct MistralClient {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl MistralClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            api_key,
            base_url,
            model,
            client,
        })
    }

    /// 설정에서 생성 (API 키 필요)
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.api_key()?.to_string(),
            config.base_url.clone(),
            config.model.clone(),
        )
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Mistral API 에러 응답 (`message` 또는 `detail`)
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// 에러 응답 본문에서 메시지 추출
fn error_message(body: &str) -> String {
    let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
    parsed
        .and_then(|e| e.message.or(e.detail))
        .map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|| body.to_string())
}

/// HTTP 상태 + 본문을 결과로 변환
///
/// 400은 입력이 컨텍스트 윈도우를 넘은 경우로 취급합니다.
fn parse_completion(status: u16, body: &str) -> Result<String> {
    if status == 400 {
        return Err(RagError::ContextWindowExceeded(error_message(body)));
    }

    if !(200..300).contains(&status) {
        return Err(RagError::Api {
            status,
            message: error_message(body),
        });
    }

    let response: CompletionResponse = serde_json::from_str(body).map_err(|e| RagError::Api {
        status,
        message: format!("Failed to parse chat response: {}", e),
    })?;

    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| RagError::Api {
            status,
            message: "Response contained no choices".to_string(),
        })
}

#[async_trait]
impl ChatModel for MistralClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(status, model = %self.model, "chat completion response");
        parse_completion(status, &body)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에서 공유 채팅 모델 생성
pub fn create_chat_model(config: &AppConfig) -> Result<Arc<dyn ChatModel>> {
    let client = MistralClient::from_config(config)?;
    tracing::info!("Using Mistral chat model: {}", client.model());
    Ok(Arc::new(client))
}

// ============================================================================
// Tests
// ============================================================================
