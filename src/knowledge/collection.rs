//! 인메모리 벡터 컬렉션
//!
//! 청크를 임베딩과 함께 저장하고 코사인 유사도로 최근접 검색합니다.
//! 증분 갱신이나 퇴출 없이 세션마다 새로 만들어집니다.

use std::collections::HashSet;

use crate::error::{RagError, Result};

use super::document::DocumentMetadata;
use super::vector::{cosine_similarity, CollectionEntry, QueryHit};

/// 인메모리 컬렉션
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    entries: Vec<CollectionEntry>,
    ids: HashSet<String>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            ids: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 엔트리 추가 (ID 중복 시 에러)
    pub fn add(
        &mut self,
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: DocumentMetadata,
        embedding: Vec<f32>,
    ) -> Result<()> {
        let id = id.into();
        if !self.ids.insert(id.clone()) {
            return Err(RagError::DuplicateId {
                collection: self.name.clone(),
                id,
            });
        }

        self.entries.push(CollectionEntry {
            id,
            text: text.into(),
            metadata,
            embedding,
        });
        Ok(())
    }

    /// 유사도 내림차순으로 상위 `n_results`개 반환
    pub fn query(&self, query_embedding: &[f32], n_results: usize) -> Vec<QueryHit> {
        let mut scored: Vec<(f32, &CollectionEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(&entry.embedding, query_embedding), entry))
            .collect();

        // 동점이면 먼저 추가된 엔트리 우선 (stable sort)
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n_results);

        scored
            .into_iter()
            .map(|(score, entry)| QueryHit {
                id: entry.id.clone(),
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
                score,
            })
            .collect()
    }

    /// 가장 유사한 단일 엔트리
    pub fn query_top(&self, query_embedding: &[f32]) -> Option<QueryHit> {
        self.query(query_embedding, 1).into_iter().next()
    }

    pub fn entries(&self) -> &[CollectionEntry] {
        &self.entries
    }
}
