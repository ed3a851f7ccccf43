//! 에러 타입
//!
//! 파이프라인 각 단계에서 발생하는 실패를 구분합니다.
//! CLI 계층은 anyhow로 감싸고, 웹 계층은 `user_message()`를 그대로 노출합니다.

use std::path::PathBuf;

use thiserror::Error;

/// RAG 파이프라인 에러
#[derive(Debug, Error)]
pub enum RagError {
    /// 모델 API 키 미설정
    #[error("API key for Mistral is missing")]
    MissingApiKey,

    /// 로드된 문서 없음
    #[error("No documents found in '{}'", .source_dir.display())]
    NoDocuments { source_dir: PathBuf },

    /// 지원하지 않는 파일 형식
    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    /// 빈 업로드
    #[error("Uploaded file is empty: {0}")]
    EmptyUpload(String),

    /// 텍스트 추출 실패
    #[error("Failed to extract text from {file_name}: {message}")]
    Extraction { file_name: String, message: String },

    /// 컬렉션 ID 중복
    #[error("Duplicate id in collection '{collection}': {id}")]
    DuplicateId { collection: String, id: String },

    /// 임베딩 실패
    #[error("Embedding error ({provider}): {message}")]
    Embedding { provider: String, message: String },

    /// 입력이 모델 컨텍스트 윈도우 초과 (HTTP 400)
    #[error("Input exceeds the model context window: {0}")]
    ContextWindowExceeded(String),

    /// 모델 API 에러
    #[error("Mistral API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP 전송 에러
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 파일 I/O 에러
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RagError {
    /// 사용자에게 보여줄 메시지
    pub fn user_message(&self) -> String {
        match self {
            RagError::ContextWindowExceeded(_) => CONTEXT_WINDOW_NOTICE.to_string(),
            RagError::Api { message, .. } => format!("An error occurred: {}", message),
            other => other.to_string(),
        }
    }

    /// 사용자 입력 문제인지 (웹 계층에서 4xx 매핑용)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RagError::NoDocuments { .. }
                | RagError::UnsupportedFile(_)
                | RagError::EmptyUpload(_)
                | RagError::Extraction { .. }
                | RagError::ContextWindowExceeded(_)
        )
    }
}

/// 컨텍스트 윈도우 초과 안내 문구
pub const CONTEXT_WINDOW_NOTICE: &str =
    "File too big for the Mistral context window (32k tokens). Please try with a smaller file.";

/// 크레이트 공통 Result
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_documents_message() {
        let err = RagError::NoDocuments {
            source_dir: PathBuf::from("./data"),
        };
        assert_eq!(err.to_string(), "No documents found in './data'");
    }

    #[test]
    fn test_user_message_for_context_window() {
        let err = RagError::ContextWindowExceeded("too many tokens".to_string());
        assert_eq!(err.user_message(), CONTEXT_WINDOW_NOTICE);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_user_message_for_api_error() {
        let err = RagError::Api {
            status: 500,
            message: "internal".to_string(),
        };
        assert_eq!(err.user_message(), "An error occurred: internal");
        assert!(!err.is_client_error());
    }
}
