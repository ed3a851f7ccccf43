//! RAG 파이프라인
//!
//! Loader → Chunker → Indexer → Retriever → Prompt → Model 을 순서대로 호출합니다.
//! 각 단계는 상태 없는 메서드이고, 실패는 로그를 남긴 뒤 그대로 호출자에게 돌려줍니다.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collector::FileCollector;
use crate::config::AppConfig;
use crate::embedding::{create_embedder, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::extractor::ContentExtractor;
use crate::knowledge::{size_chunker, Chunk, Chunker, Collection, Document};
use crate::llm::{create_chat_model, ChatMessage, ChatModel};

use super::prompts::{
    chunk_summary_prompt, combine_summaries_prompt, summary_prompt, PromptKey, NO_RESULTS,
};

/// 컬렉션 이름
const COLLECTION_NAME: &str = "docrag";

// ============================================================================
// Types
// ============================================================================

/// 문서 출처
#[derive(Debug, Clone)]
pub enum DataSource {
    /// 데이터 폴더 (재귀)
    Directory(PathBuf),
    /// 업로드된 파일
    Upload { file_name: String, bytes: Vec<u8> },
}

/// `prepare_data` 결과
pub struct PreparedData {
    pub documents: Vec<Document>,
    /// 청크 (컬렉션 생성 시에만)
    pub nodes: Option<Vec<Chunk>>,
    pub collection: Option<Collection>,
    /// 모델 이름
    pub model: String,
    /// 공유 모델 클라이언트
    pub client: Arc<dyn ChatModel>,
}

impl PreparedData {
    pub fn node_count(&self) -> usize {
        self.nodes.as_ref().map(Vec::len).unwrap_or(0)
    }
}

/// 요약 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMode {
    /// 전체 텍스트를 한 번에 요약
    #[default]
    Whole,
    /// 청크별 요약 후 통합
    MapReduce,
}

/// 요약 결과
///
/// 실패 시 `text`는 빈 문자열이고 `notice`에 사용자 안내가 담깁니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub text: String,
    pub notice: Option<String>,
}

impl Summary {
    fn failed(notice: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            notice: Some(notice.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.notice.is_none()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// RAG 파이프라인
pub struct Pipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    model: Arc<dyn ChatModel>,
    chunker: Box<dyn Chunker>,
    collector: FileCollector,
    extractor: ContentExtractor,
}

impl Pipeline {
    /// 구성 요소로 생성
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn ChatModel>,
        chunker: Box<dyn Chunker>,
    ) -> Self {
        Self {
            embedder,
            model,
            chunker,
            collector: FileCollector::with_defaults(),
            extractor: ContentExtractor::new(),
        }
    }

    /// 설정에서 생성 (API 키 없으면 `MissingApiKey`)
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let model = create_chat_model(config)?;
        let embedder = create_embedder(config)?;
        Ok(Self::new(embedder, model, size_chunker(config.chunk_size)))
    }

    pub fn model(&self) -> &Arc<dyn ChatModel> {
        &self.model
    }

    /// 문서 로드
    pub async fn load(&self, source: DataSource) -> Result<Vec<Document>> {
        let result = match source {
            DataSource::Directory(dir) => self.load_dir(dir).await,
            DataSource::Upload { file_name, bytes } => {
                self.extractor.extract_upload(&file_name, bytes).await
            }
        };

        if let Err(ref e) = result {
            tracing::error!("Error loading data: {}", e);
        }
        result
    }

    async fn load_dir(&self, dir: PathBuf) -> Result<Vec<Document>> {
        let files = self.collector.collect_directory(&dir)?;
        let mut documents = Vec::new();

        for file in &files {
            match self.extractor.extract_file(file).await {
                Ok(docs) => documents.extend(docs),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", file.path.display(), e);
                }
            }
        }

        if documents.is_empty() {
            return Err(RagError::NoDocuments { source_dir: dir });
        }

        tracing::info!(
            "Loaded {} documents from {} files in {}",
            documents.len(),
            files.len(),
            dir.display()
        );
        Ok(documents)
    }

    /// 문서를 노드(청크)로 분할
    pub fn parse(&self, documents: &[Document]) -> Vec<Chunk> {
        let nodes = self.chunker.chunk(documents);
        tracing::debug!(
            "{} split {} documents into {} nodes",
            self.chunker.name(),
            documents.len(),
            nodes.len()
        );
        nodes
    }

    /// 노드를 임베딩하여 컬렉션 생성 (ID = 노드 순번)
    pub async fn vector_db(&self, nodes: &[Chunk]) -> Result<Collection> {
        let mut collection = Collection::new(COLLECTION_NAME);
        if nodes.is_empty() {
            return Ok(collection);
        }

        let texts: Vec<String> = nodes.iter().map(|n| n.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await.map_err(|e| {
            tracing::error!("Error setting up the vector database: {}", e);
            e
        })?;

        if embeddings.len() != nodes.len() {
            return Err(RagError::Embedding {
                provider: self.embedder.name().to_string(),
                message: format!(
                    "Expected {} embeddings, got {}",
                    nodes.len(),
                    embeddings.len()
                ),
            });
        }

        for (i, (node, embedding)) in nodes.iter().zip(embeddings).enumerate() {
            collection.add(i.to_string(), node.text.clone(), node.metadata.clone(), embedding)?;
        }

        tracing::info!(
            "Indexed {} nodes into collection '{}'",
            collection.len(),
            collection.name()
        );
        Ok(collection)
    }

    /// 모델 호출용 데이터 준비
    ///
    /// `include_collection`이 false면 청킹/인덱싱을 건너뜁니다 (요약 전용).
    pub async fn prepare_data(
        &self,
        source: DataSource,
        include_collection: bool,
    ) -> Result<PreparedData> {
        let documents = self.load(source).await?;

        let (nodes, collection) = if include_collection {
            let nodes = self.parse(&documents);
            let collection = self.vector_db(&nodes).await?;
            (Some(nodes), Some(collection))
        } else {
            (None, None)
        };

        Ok(PreparedData {
            documents,
            nodes,
            collection,
            model: self.model.model().to_string(),
            client: Arc::clone(&self.model),
        })
    }

    /// 검색된 청크 기반 질의응답
    ///
    /// 검색 결과가 없으면 모델을 호출하지 않고 고정 문구를 반환합니다.
    pub async fn get_answer(
        &self,
        question: &str,
        collection: &Collection,
        prompt_key: PromptKey,
    ) -> Result<String> {
        let result = self.answer(question, collection, prompt_key).await;
        if let Err(ref e) = result {
            tracing::error!("Failed to get answer: {}", e);
        }
        result
    }

    async fn answer(
        &self,
        question: &str,
        collection: &Collection,
        prompt_key: PromptKey,
    ) -> Result<String> {
        if collection.is_empty() {
            return Ok(NO_RESULTS.to_string());
        }

        let query_embedding = self.embedder.embed(question).await?;
        let Some(hit) = collection.query_top(&query_embedding) else {
            return Ok(NO_RESULTS.to_string());
        };

        tracing::debug!(id = %hit.id, score = hit.score, "retrieved top chunk");

        let prompt = prompt_key.render(
            question,
            &hit.text,
            &hit.metadata.file_name_or_unknown(),
            &hit.metadata.page_label_or_unknown(),
        );

        self.model.chat(&[ChatMessage::user(prompt)]).await
    }

    /// 문서 요약
    ///
    /// 모델 에러는 전파하지 않고 빈 요약 + 안내 문구로 바꿉니다.
    pub async fn get_summary(&self, documents: &[Document], mode: SummaryMode) -> Summary {
        let result = match mode {
            SummaryMode::Whole => self.summarize_whole(documents).await,
            SummaryMode::MapReduce => self.summarize_map_reduce(documents).await,
        };

        match result {
            Ok(text) => Summary { text, notice: None },
            Err(e) => {
                tracing::error!("Summary failed: {}", e);
                Summary::failed(e.user_message())
            }
        }
    }

    async fn summarize_whole(&self, documents: &[Document]) -> Result<String> {
        let text = documents
            .iter()
            .map(|d| d.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        if text.is_empty() {
            return Err(RagError::Extraction {
                file_name: documents
                    .first()
                    .map(|d| d.metadata.file_name_or_unknown())
                    .unwrap_or_else(|| "Unknown".to_string()),
                message: "no text to summarize".to_string(),
            });
        }

        self.model
            .chat(&[ChatMessage::user(summary_prompt(&text))])
            .await
    }

    async fn summarize_map_reduce(&self, documents: &[Document]) -> Result<String> {
        let nodes = self.parse(documents);
        if nodes.is_empty() {
            return self.summarize_whole(documents).await;
        }

        let mut chunk_summaries = Vec::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            tracing::debug!("Summarizing chunk {}/{}", i + 1, nodes.len());
            let summary = self
                .model
                .chat(&[ChatMessage::user(chunk_summary_prompt(i, &node.text))])
                .await?;
            chunk_summaries.push(summary);
        }

        self.model
            .chat(&[ChatMessage::user(combine_summaries_prompt(&chunk_summaries))])
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================
