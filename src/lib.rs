//! docrag - 문서 질의응답 RAG 데모
//!
//! 데이터 폴더 또는 업로드한 PDF/텍스트 파일을 청크로 나눠 인메모리 벡터
//! 컬렉션에 넣고, 질문과 가장 유사한 청크를 Mistral 채팅 API에 함께 보내
//! 답변을 생성합니다.

pub mod cli;
pub mod cache;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod knowledge;
pub mod llm;
pub mod rag;
pub mod server;

// Re-exports
pub use config::{AppConfig, EmbeddingBackend};
pub use embedding::{create_embedder, EmbeddingProvider, HashEmbedding, MistralEmbedding};
pub use error::{RagError, Result};
pub use knowledge::{Chunk, Chunker, Collection, Document, DocumentMetadata, QueryHit, SizeChunker};
pub use llm::{create_chat_model, ChatMessage, ChatModel, MistralClient, Role};
pub use rag::{
    ChatTranscript, DataSource, Pipeline, PreparedData, PromptKey, SessionStore, Summary,
    SummaryMode,
};
