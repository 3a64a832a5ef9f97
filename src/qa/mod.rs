//! QA 모듈 - 검색된 청크 기반 답변 생성
//!
//! 검색된 청크를 컨텍스트 블록으로 이어붙여 고정 프롬프트 템플릿을 채우고,
//! 채팅 완성 API로 전송합니다. 모델에는 주어진 컨텍스트로만 답하고
//! 답을 모르면 모른다고 말하도록 지시합니다.
//!
//! 프로바이더 실패는 에러 전파가 아니라 고정 폴백 variant로 내려갑니다.
//! 이는 의도된 사용자 가시적 성능 저하이며, 재시도하지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;
use crate::knowledge::ScoredChunk;

// ============================================================================
// Fallback Strings
// ============================================================================

/// 질문 또는 컨텍스트가 없을 때의 폴백
pub const INSUFFICIENT_INFORMATION: &str = "Insufficient information to answer the question.";

/// 생성 실패 시의 폴백
pub const COULD_NOT_GENERATE: &str = "Could not generate an answer.";

// ============================================================================
// GenerationError
// ============================================================================

/// 채팅 완성 API 호출 실패
#[derive(Debug, Error)]
pub enum GenerationError {
    /// 네트워크 오류 (타임아웃 포함)
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// API 오류 응답 (인증, rate limit 등)
    #[error("chat API error ({status}): {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    /// 응답 본문 파싱 실패 또는 빈 응답
    #[error("malformed chat response: {0}")]
    Response(String),
}

// ============================================================================
// ChatProvider Trait
// ============================================================================

/// 채팅 완성 프로바이더 트레이트
///
/// 프롬프트 하나를 받아 완성 텍스트 하나를 돌려주는 좁은 인터페이스입니다.
/// 테스트에서는 결정적 fake로 대체합니다.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// 프롬프트에 대한 완성 텍스트 생성
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Chat
// ============================================================================

/// OpenAI 채팅 완성 API 엔드포인트
/// source: https://platform.openai.com/docs/api-reference/chat
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// 시스템 프롬프트 - 컨텍스트 밖 지식 사용 금지
const SYSTEM_PROMPT: &str =
    "You answer questions about a single web page using only the provided context.";

/// OpenAI 채팅 완성 구현체
#[derive(Debug)]
pub struct OpenAiChat {
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiChat {
    /// 새 채팅 프로바이더 생성
    ///
    /// 낮은 온도와 제한된 출력 길이로 결정적인 답변을 선호합니다.
    pub fn new(api_key: String, model: String, temperature: f32, max_tokens: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            model,
            temperature,
            max_tokens,
            client,
        })
    }

    /// 환경변수의 API 키와 설정으로 생성
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        let api_key = crate::config::get_api_key()?;
        Self::new(
            api_key,
            config.chat_model.clone(),
            config.temperature,
            config.max_tokens,
        )
    }
}

/// 채팅 완성 요청 본문
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// 채팅 완성 응답
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

/// API 에러 응답
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GenerationError::Api { status, message });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::Response(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::Response("no choices in response".to_string()))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// QaResponse
// ============================================================================

/// 답변 결과
///
/// 폴백 문자열은 센티널이 아니라 명시적 variant입니다.
/// 호출자는 어떤 경로로 내려왔는지 구분할 수 있습니다.
#[derive(Debug, Clone)]
pub enum QaResponse {
    /// 모델이 생성한 답변과 사용된 소스 청크 (검색 순서 유지)
    Answered {
        answer: String,
        sources: Vec<ScoredChunk>,
    },
    /// 질문 또는 검색된 컨텍스트 없음
    InsufficientInformation,
    /// 프로바이더 호출 실패
    GenerationFailed,
}

impl QaResponse {
    /// 사용자에게 표시할 텍스트
    pub fn display_text(&self) -> &str {
        match self {
            QaResponse::Answered { answer, .. } => answer,
            QaResponse::InsufficientInformation => INSUFFICIENT_INFORMATION,
            QaResponse::GenerationFailed => COULD_NOT_GENERATE,
        }
    }

    /// 답변에 사용된 소스 청크
    pub fn sources(&self) -> &[ScoredChunk] {
        match self {
            QaResponse::Answered { sources, .. } => sources,
            _ => &[],
        }
    }
}

// ============================================================================
// QaEngine
// ============================================================================

/// 질의응답 엔진
///
/// 질문마다 독립적으로 동작합니다. 세션 내 대화 기억은 없습니다.
pub struct QaEngine {
    chat: Arc<dyn ChatProvider>,
}

impl QaEngine {
    /// 채팅 프로바이더로 생성
    pub fn new(chat: Arc<dyn ChatProvider>) -> Self {
        Self { chat }
    }

    /// 검색된 청크를 컨텍스트로 질문에 답변
    ///
    /// 프로바이더 실패는 로그 후 `GenerationFailed`로 내려갑니다.
    pub async fn ask(
        &self,
        question: &str,
        retrieved: &[ScoredChunk],
        source_url: Option<&str>,
    ) -> QaResponse {
        if question.trim().is_empty() || retrieved.is_empty() {
            return QaResponse::InsufficientInformation;
        }

        let prompt = build_prompt(question, retrieved, source_url);

        match self.chat.complete(&prompt).await {
            Ok(answer) => QaResponse::Answered {
                answer: answer.trim().to_string(),
                sources: retrieved.to_vec(),
            },
            Err(e) => {
                tracing::warn!("Answer generation failed: {}", e);
                QaResponse::GenerationFailed
            }
        }
    }
}

/// 고정 프롬프트 템플릿 채우기
///
/// 컨텍스트 블록은 검색 순위 순서 그대로 이어붙입니다 (재정렬 없음).
pub fn build_prompt(question: &str, retrieved: &[ScoredChunk], source_url: Option<&str>) -> String {
    let context = retrieved
        .iter()
        .map(|chunk| chunk.chunk_text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let source_line = source_url
        .map(|url| format!("The context was extracted from {}.\n\n", url))
        .unwrap_or_default();

    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, \
         don't try to make up an answer.\n\n\
         {source_line}\
         Context:\n{context}\n\n\
         Question: {question}\n\
         Helpful Answer:"
    )
}

// ============================================================================
// Tests
// ============================================================================
