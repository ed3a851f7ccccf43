//! 테스트용 가짜 모델과 임베딩

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::embedding::{EmbeddingProvider, HashEmbedding};
use crate::error::{RagError, Result};
use crate::knowledge::SizeChunker;
use crate::llm::{ChatMessage, ChatModel};

use super::pipeline::Pipeline;

/// 받은 프롬프트를 기록하고 고정 응답(또는 고정 에러)을 돌려주는 모델
pub struct FakeChatModel {
    reply: std::result::Result<String, u16>,
    prompts: Mutex<Vec<String>>,
}

impl FakeChatModel {
    pub fn answering(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_with_status(status: u16) -> Self {
        Self {
            reply: Err(status),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for FakeChatModel {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.extend(messages.iter().map(|m| m.content.clone()));

        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(400) => Err(RagError::ContextWindowExceeded("too many tokens".to_string())),
            Err(status) => Err(RagError::Api {
                status: *status,
                message: "upstream failure".to_string(),
            }),
        }
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

/// 항상 실패하는 임베딩
pub struct FailingEmbedding;

#[async_trait]
impl EmbeddingProvider for FailingEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::Embedding {
            provider: "failing".to_string(),
            message: "unavailable".to_string(),
        })
    }

    fn dimension(&self) -> usize {
        0
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// 해시 임베딩 + 가짜 모델로 파이프라인 구성
pub fn pipeline_with(model: FakeChatModel) -> (Pipeline, Arc<FakeChatModel>) {
    let model = Arc::new(model);
    let pipeline = Pipeline::new(
        Arc::new(HashEmbedding::default()),
        model.clone(),
        Box::new(SizeChunker::with_defaults()),
    );
    (pipeline, model)
}
