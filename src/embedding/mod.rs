//! 임베딩 모듈 - 텍스트 벡터화
//!
//! 청크와 질문을 벡터로 변환하는 임베딩 프로바이더입니다.
//!
//! - [`MistralEmbedding`]: Mistral `/embeddings` API (mistral-embed, 1024차원)
//! - [`HashEmbedding`]: 오프라인 해시 기반 bag-of-words 임베딩
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = create_embedder(&config)?;
//! let embedding = embedder.embed("Hello, world!").await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{AppConfig, EmbeddingBackend};
use crate::error::{RagError, Result};

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Mistral Embedding
// ============================================================================

/// mistral-embed 출력 차원
pub const MISTRAL_EMBED_DIMENSION: usize = 1024;

/// 요청당 최대 입력 개수
const MAX_BATCH_SIZE: usize = 32;

/// Mistral 임베딩 구현체
#[derive(Debug)]
pub struct MistralEmbedding {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl MistralEmbedding {
    pub fn new(api_key: String, base_url: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
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
            config.embed_model.clone(),
        )
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RagError::Embedding {
                provider: self.model.clone(),
                message: format!("{}: {}", status, body),
            });
        }

        let mut parsed: EmbedResponse =
            serde_json::from_str(&body).map_err(|e| RagError::Embedding {
                provider: self.model.clone(),
                message: format!("Failed to parse embedding response: {}", e),
            })?;

        if parsed.data.len() != inputs.len() {
            return Err(RagError::Embedding {
                provider: self.model.clone(),
                message: format!(
                    "Expected {} embeddings, got {}",
                    inputs.len(),
                    parsed.data.len()
                ),
            });
        }

        // 응답 순서는 index 기준으로 정렬
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[async_trait]
impl EmbeddingProvider for MistralEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut results = self.request(&[text.to_string()]).await?;
        results.pop().ok_or_else(|| RagError::Embedding {
            provider: self.model.clone(),
            message: "Empty embedding response".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(MAX_BATCH_SIZE).enumerate() {
            tracing::debug!(
                "Embedding batch {} ({} inputs)",
                i + 1,
                batch.len()
            );
            results.extend(self.request(batch).await?);
        }

        Ok(results)
    }

    fn dimension(&self) -> usize {
        MISTRAL_EMBED_DIMENSION
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Hash Embedding
// ============================================================================

/// 해시 임베딩 기본 차원
pub const HASH_DIMENSION: usize = 256;

/// 오프라인 해시 임베딩
///
/// 소문자 영숫자 토큰을 SHA-256으로 버킷에 사상한 뒤 L2 정규화합니다.
/// 같은 단어를 공유하는 텍스트끼리 유사도가 높아집니다.
#[derive(Debug, Clone)]
pub struct HashEmbedding {
    dimension: usize,
}

impl HashEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new(HASH_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash"
    }
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 맞는 임베딩 프로바이더 생성
pub fn create_embedder(config: &AppConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embedding {
        EmbeddingBackend::Mistral => Arc::new(MistralEmbedding::from_config(config)?),
        EmbeddingBackend::Hash => Arc::new(HashEmbedding::default()),
    };

    tracing::info!(
        "Using {} embedding (dimension: {})",
        embedder.name(),
        embedder.dimension()
    );
    Ok(embedder)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::cosine_similarity;

    #[tokio::test]
    async fn test_hash_embedding_is_deterministic_and_normalised() {
        let embedder = HashEmbedding::default();
        let a = embedder.embed("Net profit in 2023").await.unwrap();
        let b = embedder.embed("net PROFIT in 2023").await.unwrap();
        assert_eq!(a.len(), HASH_DIMENSION);
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_hash_embedding_similarity() {
        let embedder = HashEmbedding::default();
        let question = embedder.embed("What is the net profit?").await.unwrap();
        let related = embedder.embed("The net profit was 3 million.").await.unwrap();
        let unrelated = embedder.embed("Cats sleep most of the day.").await.unwrap();
        assert!(cosine_similarity(&question, &related) > cosine_similarity(&question, &unrelated));
    }

    #[tokio::test]
    async fn test_hash_embedding_empty_text() {
        let embedder = HashEmbedding::new(8);
        let v = embedder.embed("   ").await.unwrap();
        assert_eq!(v, vec![0.0; 8]);
    }

    #[test]
    fn test_create_embedder_requires_key_for_mistral() {
        let config = AppConfig::default();
        assert!(matches!(create_embedder(&config), Err(RagError::MissingApiKey)));

        let config = AppConfig {
            embedding: EmbeddingBackend::Hash,
            ..AppConfig::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.name(), "hash");
    }
}
