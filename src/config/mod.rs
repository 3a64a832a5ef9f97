//! 설정 모듈 - 환경변수 기반 애플리케이션 설정
//!
//! 프로세스 시작 시 환경변수를 한 번 읽어 명시적 설정 객체로 만듭니다.
//! 각 컴포넌트는 전역 상태가 아닌 이 객체를 생성자에서 전달받습니다.

use anyhow::{Context, Result};

use crate::knowledge::ChunkConfig;

// ============================================================================
// Defaults
// ============================================================================

/// 기본 채팅 모델
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
/// 기본 임베딩 모델
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// 기본 청크 크기 (문자 수)
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// 기본 오버랩 크기 (문자 수)
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// 기본 검색 결과 개수
pub const DEFAULT_TOP_K: usize = 3;
/// 샘플링 온도 (낮을수록 결정적)
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
/// 응답 최대 토큰 수
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

// ============================================================================
// AppConfig
// ============================================================================

/// 애플리케이션 설정
///
/// 환경변수:
/// - `OPENAI_MODEL` - 채팅 모델 이름
/// - `OPENAI_EMBEDDING_MODEL` - 임베딩 모델 이름
/// - `CHUNK_SIZE` / `CHUNK_OVERLAP` - 청킹 설정 (문자 수)
/// - `TOP_K` - 질문당 검색할 청크 개수
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 채팅 모델 이름
    pub chat_model: String,
    /// 임베딩 모델 이름
    pub embedding_model: String,
    /// 청크 크기 (문자 수)
    pub chunk_size: usize,
    /// 청크 간 오버랩 (문자 수)
    pub chunk_overlap: usize,
    /// 질문당 검색할 청크 개수
    pub top_k: usize,
    /// 샘플링 온도
    pub temperature: f32,
    /// 응답 최대 토큰 수
    pub max_tokens: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl AppConfig {
    /// 환경변수에서 설정 로드
    ///
    /// 설정되지 않은 항목은 기본값을 사용합니다.
    /// 숫자 항목이 파싱되지 않으면 에러를 반환합니다.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(model) = env_string("OPENAI_MODEL") {
            config.chat_model = model;
        }
        if let Some(model) = env_string("OPENAI_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(size) = env_usize("CHUNK_SIZE")? {
            config.chunk_size = size;
        }
        if let Some(overlap) = env_usize("CHUNK_OVERLAP")? {
            config.chunk_overlap = overlap;
        }
        if let Some(top_k) = env_usize("TOP_K")? {
            config.top_k = top_k;
        }

        if config.chunk_size == 0 {
            anyhow::bail!("CHUNK_SIZE must be greater than 0");
        }
        if config.chunk_overlap >= config.chunk_size {
            anyhow::bail!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                config.chunk_overlap,
                config.chunk_size
            );
        }

        Ok(config)
    }

    /// 청킹 설정으로 변환
    pub fn chunk_config(&self) -> ChunkConfig {
        ChunkConfig {
            chunk_size: self.chunk_size,
            overlap: self.chunk_overlap,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// 문자열 환경변수 (빈 값은 미설정으로 취급)
fn env_string(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

/// 숫자 환경변수 (빈 값은 미설정으로 취급)
fn env_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            let parsed = value
                .trim()
                .parse::<usize>()
                .with_context(|| format!("{} must be a non-negative integer: {:?}", name, value))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 로드 (환경변수에서)
///
/// `OPENAI_API_KEY` 환경변수를 읽습니다.
pub fn get_api_key() -> Result<String> {
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.is_empty() {
            tracing::debug!("Using API key from OPENAI_API_KEY");
            return Ok(key);
        }
    }

    anyhow::bail!(
        "API key not found. Set the OPENAI_API_KEY environment variable.\n\
         Get your API key at: https://platform.openai.com/api-keys"
    )
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) => !key.is_empty(),
        Err(_) => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.chat_model, "gpt-4o");
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.top_k, 3);
    }

    #[test]
    fn test_chunk_config_conversion() {
        let config = AppConfig::default();
        let chunk = config.chunk_config();
        assert_eq!(chunk.chunk_size, config.chunk_size);
        assert_eq!(chunk.overlap, config.chunk_overlap);
    }

    // 환경변수를 건드리는 검증은 테스트 간 경쟁을 피하려고 한 함수에 모았습니다.
    #[test]
    fn test_from_env_parsing() {
        std::env::remove_var("OPENAI_MODEL");
        std::env::remove_var("OPENAI_EMBEDDING_MODEL");
        std::env::remove_var("CHUNK_SIZE");
        std::env::remove_var("CHUNK_OVERLAP");
        std::env::remove_var("TOP_K");

        // 미설정이면 기본값
        let config = AppConfig::from_env().expect("defaults should load");
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);

        // 유효한 값 적용
        std::env::set_var("CHUNK_SIZE", "500");
        std::env::set_var("CHUNK_OVERLAP", "50");
        let config = AppConfig::from_env().expect("valid values should load");
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);

        // 파싱 불가 값은 에러
        std::env::set_var("CHUNK_SIZE", "not-a-number");
        assert!(AppConfig::from_env().is_err());

        // 오버랩이 청크 크기 이상이면 에러
        std::env::set_var("CHUNK_SIZE", "100");
        std::env::set_var("CHUNK_OVERLAP", "100");
        assert!(AppConfig::from_env().is_err());

        std::env::remove_var("CHUNK_SIZE");
        std::env::remove_var("CHUNK_OVERLAP");
    }
}
