//! Knowledge 모듈 - 문서 모델, 청킹, 인메모리 벡터 컬렉션
//!
//! - Document / Chunk: 로드된 텍스트와 메타데이터
//! - Chunker: 크기 기반 텍스트 분할
//! - Collection: 코사인 유사도 최근접 검색

mod chunker;
mod collection;
mod document;
mod vector;

// Re-exports
pub use chunker::{size_chunker, Chunker, SizeChunker};
pub use collection::Collection;
pub use document::{Chunk, Document, DocumentMetadata};
pub use vector::{cosine_similarity, CollectionEntry, QueryHit};
