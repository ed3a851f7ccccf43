//! 콘텐츠 추출 모듈
//!
//! 파일을 `Document` 목록으로 변환합니다.
//! - 텍스트 파일: 직접 읽기 (UTF-8, 손실 허용)
//! - PDF 파일: pdf-extract로 페이지별 추출

pub mod pdf;

use std::path::Path;

use crate::collector::{CollectedFile, FileType};
use crate::error::{RagError, Result};
use crate::knowledge::{Document, DocumentMetadata};

/// 콘텐츠 추출기
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 수집된 파일에서 문서 추출
    pub async fn extract_file(&self, file: &CollectedFile) -> Result<Vec<Document>> {
        let bytes = tokio::fs::read(&file.path).await?;
        self.extract(&file.file_name(), file.file_type, bytes).await
    }

    /// 업로드된 파일(이름 + 바이트)에서 문서 추출
    pub async fn extract_upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<Vec<Document>> {
        if bytes.is_empty() {
            return Err(RagError::EmptyUpload(file_name.to_string()));
        }

        let file_type = FileType::from_path(Path::new(file_name))
            .ok_or_else(|| RagError::UnsupportedFile(file_name.to_string()))?;

        self.extract(file_name, file_type, bytes).await
    }

    async fn extract(
        &self,
        file_name: &str,
        file_type: FileType,
        bytes: Vec<u8>,
    ) -> Result<Vec<Document>> {
        match file_type {
            FileType::Text => Ok(vec![extract_text(file_name, &bytes)]),
            FileType::Pdf => extract_pdf(file_name, bytes).await,
        }
    }
}

fn extract_text(file_name: &str, bytes: &[u8]) -> Document {
    let text = String::from_utf8_lossy(bytes).into_owned();
    Document::new(text, DocumentMetadata::for_file(file_name))
}

/// PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
async fn extract_pdf(file_name: &str, bytes: Vec<u8>) -> Result<Vec<Document>> {
    let name = file_name.to_string();
    let pages = tokio::task::spawn_blocking(move || pdf::extract_pages_from_mem(&name, &bytes))
        .await
        .map_err(|e| RagError::Extraction {
            file_name: file_name.to_string(),
            message: format!("PDF extraction task failed: {}", e),
        })??;

    Ok(pages
        .into_iter()
        .map(|(page, text)| {
            Document::new(text, DocumentMetadata::for_file(file_name).with_page(page))
        })
        .collect())
}

// ============================================================================
// Tests
// ============================================================================
