//! 설정 모듈
//!
//! 환경변수 (및 `.env` 파일)에서 실행 설정을 읽습니다.
//!
//! | 변수 | 기본값 |
//! |------|--------|
//! | `API_KEY` / `MISTRAL_API_KEY` | (없음) |
//! | `MISTRAL_MODEL` | `mistral-tiny` |
//! | `MISTRAL_EMBED_MODEL` | `mistral-embed` |
//! | `MISTRAL_BASE_URL` | `https://api.mistral.ai/v1` |
//! | `RAG_DATA_DIR` | `./data` |
//! | `RAG_CHUNK_SIZE` | `5000` |
//! | `RAG_EMBEDDING` | `mistral` |
//! | `RAG_MAX_UPLOAD_MB` | `20` |
//! | `RAG_MAX_SESSIONS` | `256` |
//! | `RAG_MAX_UPLOADS` | `16` |
//! | `RAG_BIND` | `127.0.0.1:8501` |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{RagError, Result};
use crate::rag::session::DEFAULT_MAX_SESSIONS;

/// 기본 채팅 모델
pub const DEFAULT_MODEL: &str = "mistral-tiny";
/// 기본 임베딩 모델
pub const DEFAULT_EMBED_MODEL: &str = "mistral-embed";
/// Mistral API 기본 주소
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";
/// 기본 청크 크기 (문자 수)
pub const DEFAULT_CHUNK_SIZE: usize = 5000;
/// 기본 바인드 주소
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";
/// 기본 최대 업로드 보관 수
pub const DEFAULT_MAX_UPLOADS: usize = 16;

// ============================================================================
// Embedding Backend
// ============================================================================

/// 임베딩 백엔드 선택
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Mistral 임베딩 API
    Mistral,
    /// 오프라인 해시 임베딩 (API 호출 없음)
    Hash,
}

impl FromStr for EmbeddingBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mistral" => Ok(EmbeddingBackend::Mistral),
            "hash" => Ok(EmbeddingBackend::Hash),
            other => Err(RagError::Config(format!(
                "RAG_EMBEDDING must be 'mistral' or 'hash', got '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// AppConfig
// ============================================================================

/// 애플리케이션 설정
#[derive(Clone)]
pub struct AppConfig {
    pub(crate) api_key: Option<String>,
    pub model: String,
    pub embed_model: String,
    pub base_url: String,
    pub data_dir: PathBuf,
    pub chunk_size: usize,
    pub embedding: EmbeddingBackend,
    pub max_upload_bytes: usize,
    /// 보관할 최대 세션 수 (LRU)
    pub max_sessions: usize,
    /// 보관할 최대 업로드 파일 수 (LRU)
    pub max_uploads: usize,
    pub bind: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from("./data"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            embedding: EmbeddingBackend::Mistral,
            max_upload_bytes: 20 * 1024 * 1024,
            max_sessions: DEFAULT_MAX_SESSIONS,
            max_uploads: DEFAULT_MAX_UPLOADS,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl AppConfig {
    /// `.env` 로드 후 환경변수에서 설정 생성
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로부터 설정 생성
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        // 우선순위: API_KEY > MISTRAL_API_KEY
        let api_key = get("API_KEY").or_else(|| get("MISTRAL_API_KEY"));

        let chunk_size = match get("RAG_CHUNK_SIZE") {
            Some(v) => parse_positive("RAG_CHUNK_SIZE", &v)?,
            None => defaults.chunk_size,
        };

        let max_upload_bytes = match get("RAG_MAX_UPLOAD_MB") {
            Some(v) => parse_positive("RAG_MAX_UPLOAD_MB", &v)?
                .checked_mul(1024 * 1024)
                .ok_or_else(|| {
                    RagError::Config(format!("RAG_MAX_UPLOAD_MB is too large, got '{}'", v))
                })?,
            None => defaults.max_upload_bytes,
        };

        let max_sessions = match get("RAG_MAX_SESSIONS") {
            Some(v) => parse_positive("RAG_MAX_SESSIONS", &v)?,
            None => defaults.max_sessions,
        };

        let max_uploads = match get("RAG_MAX_UPLOADS") {
            Some(v) => parse_positive("RAG_MAX_UPLOADS", &v)?,
            None => defaults.max_uploads,
        };

        let embedding = match get("RAG_EMBEDDING") {
            Some(v) => v.parse()?,
            None => defaults.embedding,
        };

        Ok(Self {
            api_key,
            model: get("MISTRAL_MODEL").unwrap_or(defaults.model),
            embed_model: get("MISTRAL_EMBED_MODEL").unwrap_or(defaults.embed_model),
            base_url: get("MISTRAL_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            data_dir: get("RAG_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            chunk_size,
            embedding,
            max_upload_bytes,
            max_sessions,
            max_uploads,
            bind: get("RAG_BIND").unwrap_or(defaults.bind),
        })
    }

    /// API 키 설정 (테스트 및 CLI 용)
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// API 키 반환 (없으면 에러)
    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or(RagError::MissingApiKey)
    }

    /// API 키 존재 여부
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("embed_model", &self.embed_model)
            .field("base_url", &self.base_url)
            .field("data_dir", &self.data_dir)
            .field("chunk_size", &self.chunk_size)
            .field("embedding", &self.embedding)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("max_sessions", &self.max_sessions)
            .field("max_uploads", &self.max_uploads)
            .field("bind", &self.bind)
            .finish()
    }
}

fn parse_positive(key: &str, value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(RagError::Config(format!(
            "{} must be a positive integer, got '{}'",
            key, value
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.model, "mistral-tiny");
        assert_eq!(config.chunk_size, 5000);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.embedding, EmbeddingBackend::Mistral);
        assert!(!config.has_api_key());
        assert!(matches!(config.api_key(), Err(RagError::MissingApiKey)));
    }

    #[test]
    fn test_api_key_priority() {
        let config = config_from(&[("API_KEY", "primary"), ("MISTRAL_API_KEY", "fallback")]).unwrap();
        assert_eq!(config.api_key().unwrap(), "primary");

        let config = config_from(&[("MISTRAL_API_KEY", "fallback")]).unwrap();
        assert_eq!(config.api_key().unwrap(), "fallback");

        let config = config_from(&[("API_KEY", "  ")]).unwrap();
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("RAG_CHUNK_SIZE", "800"),
            ("RAG_EMBEDDING", "HASH"),
            ("MISTRAL_BASE_URL", "http://localhost:9000/v1/"),
            ("RAG_MAX_UPLOAD_MB", "2"),
            ("RAG_MAX_SESSIONS", "10"),
            ("RAG_MAX_UPLOADS", "3"),
        ])
        .unwrap();
        assert_eq!(config.max_sessions, 10);
        assert_eq!(config.max_uploads, 3);
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.embedding, EmbeddingBackend::Hash);
        assert_eq!(config.base_url, "http://localhost:9000/v1");
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = AppConfig::default().with_api_key("sk-secret");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config_from(&[("RAG_CHUNK_SIZE", "0")]),
            Err(RagError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("RAG_CHUNK_SIZE", "abc")]),
            Err(RagError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("RAG_EMBEDDING", "openai")]),
            Err(RagError::Config(_))
        ));
    }

    #[test]
    fn test_upload_limit_overflow_is_config_error() {
        let huge = usize::MAX.to_string();
        match config_from(&[("RAG_MAX_UPLOAD_MB", huge.as_str())]) {
            Err(RagError::Config(msg)) => assert!(msg.contains("too large")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
