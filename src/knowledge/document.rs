//! 문서 / 청크 데이터 모델

use std::fmt;

use serde::{Deserialize, Serialize};

/// 문서 메타데이터
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// 원본 파일 이름
    pub file_name: Option<String>,
    /// PDF 페이지 라벨 (1부터 시작)
    pub page_label: Option<usize>,
}

impl DocumentMetadata {
    /// 파일 이름만으로 생성
    pub fn for_file(file_name: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            page_label: None,
        }
    }

    /// 페이지 라벨 지정
    pub fn with_page(mut self, page_label: usize) -> Self {
        self.page_label = Some(page_label);
        self
    }

    /// 표시용 파일 이름 (없으면 "Unknown")
    pub fn file_name_or_unknown(&self) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// 표시용 페이지 번호 (없으면 "Unknown")
    pub fn page_label_or_unknown(&self) -> String {
        self.page_label
            .map(|p| p.to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

impl fmt::Display for DocumentMetadata {
    /// `page_label: 3\nfile_name: paper.pdf` 형식
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::with_capacity(2);
        if let Some(page) = self.page_label {
            lines.push(format!("page_label: {}", page));
        }
        if let Some(ref name) = self.file_name {
            lines.push(format!("file_name: {}", name));
        }
        write!(f, "{}", lines.join("\n"))
    }
}

/// 로드된 문서 (생성 후 불변)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

/// 크기 제한된 문서 조각 (노드)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// 원본 문서에서 상속한 메타데이터
    pub metadata: DocumentMetadata,
    /// 문서 내 청크 순번 (0-based)
    pub chunk_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_display() {
        let meta = DocumentMetadata::for_file("paper.pdf").with_page(3);
        assert_eq!(meta.to_string(), "page_label: 3\nfile_name: paper.pdf");

        let meta = DocumentMetadata::for_file("notes.txt");
        assert_eq!(meta.to_string(), "file_name: notes.txt");
    }

    #[test]
    fn test_unknown_fallbacks() {
        let meta = DocumentMetadata::default();
        assert_eq!(meta.file_name_or_unknown(), "Unknown");
        assert_eq!(meta.page_label_or_unknown(), "Unknown");
    }
}
