//! Text Chunking Module
//!
//! 문서를 크기 제한된 청크(노드)로 분할합니다.
//! 오버랩이나 병합 없이 크기 기준으로만 나누며, 가능한 한 자연스러운 경계
//! (문단 → 줄 → 문장 → 단어)에서 자릅니다.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::DEFAULT_CHUNK_SIZE;

use super::document::{Chunk, Document};

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 문서 목록을 청크로 분할 (메타데이터 상속)
    fn chunk(&self, documents: &[Document]) -> Vec<Chunk>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// SizeChunker
// ============================================================================

/// 분할 경계 단계
#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

const BOUNDARIES: [Boundary; 4] = [
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Word,
];

impl Boundary {
    fn joiner(self) -> &'static str {
        match self {
            Boundary::Paragraph => "\n\n",
            Boundary::Line => "\n",
            Boundary::Sentence | Boundary::Word => " ",
        }
    }

    fn split(self, text: &str) -> Vec<&str> {
        let pieces: Vec<&str> = match self {
            Boundary::Paragraph => text.split("\n\n").collect(),
            Boundary::Line => text.lines().collect(),
            Boundary::Sentence => split_sentences(text),
            Boundary::Word => text.split_whitespace().collect(),
        };

        pieces
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// 크기 기반 청커
///
/// 모든 청크는 `chunk_size` 문자 이하입니다.
#[derive(Debug, Clone)]
pub struct SizeChunker {
    chunk_size: usize,
}

impl SizeChunker {
    /// 최대 문자 수로 생성 (0은 1로 보정)
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// 기본 크기(5000자)로 생성
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// 단일 텍스트 분할
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return vec![];
        }

        let mut out = Vec::new();
        self.split_at_level(text, 0, &mut out);
        out
    }

    fn split_at_level(&self, text: &str, level: usize, out: &mut Vec<String>) {
        if char_len(text) <= self.chunk_size {
            out.push(text.to_string());
            return;
        }

        let Some(&boundary) = BOUNDARIES.get(level) else {
            hard_split(text, self.chunk_size, out);
            return;
        };

        let joiner = boundary.joiner();
        let mut current = String::new();

        for piece in boundary.split(text) {
            // 조각 자체가 너무 크면 다음 경계로 분할
            if char_len(piece) > self.chunk_size {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                self.split_at_level(piece, level + 1, out);
                continue;
            }

            let needed = if current.is_empty() {
                char_len(piece)
            } else {
                char_len(&current) + joiner.len() + char_len(piece)
            };

            if needed > self.chunk_size {
                out.push(std::mem::take(&mut current));
            }

            if !current.is_empty() {
                current.push_str(joiner);
            }
            current.push_str(piece);
        }

        if !current.is_empty() {
            out.push(current);
        }
    }
}

impl Chunker for SizeChunker {
    fn chunk(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.text)
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| Chunk {
                        text,
                        metadata: doc.metadata.clone(),
                        chunk_index: i,
                    })
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "SizeChunker"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

#[inline]
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 문장 끝(. ! ?) 뒤 공백에서 분할, 구두점은 앞 문장에 남김
fn split_sentences(text: &str) -> Vec<&str> {
    static SENTENCE_END: OnceLock<Regex> = OnceLock::new();
    let re = SENTENCE_END.get_or_init(|| Regex::new(r#"[.!?]["')\]]*\s+"#).expect("Invalid regex"));

    let mut pieces = Vec::new();
    let mut start = 0;
    for m in re.find_iter(text) {
        pieces.push(&text[start..m.end()]);
        start = m.end();
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// 문자 경계에서 강제 분할
fn hard_split(text: &str, max_chars: usize, out: &mut Vec<String>) {
    let chars: Vec<char> = text.chars().collect();
    for window in chars.chunks(max_chars) {
        let piece: String = window.iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 크기 지정 청커 생성
pub fn size_chunker(chunk_size: usize) -> Box<dyn Chunker> {
    Box::new(SizeChunker::new(chunk_size))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::DocumentMetadata;

    #[test]
    fn test_chunker_empty() {
        let chunker = SizeChunker::with_defaults();
        assert!(chunker.split_text("").is_empty());
        assert!(chunker.split_text("   \n\n ").is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunker = SizeChunker::new(100);
        let chunks = chunker.split_text("Short paragraph.\n\nAnother one.");
        assert_eq!(chunks, vec!["Short paragraph.\n\nAnother one.".to_string()]);
    }

    #[test]
    fn test_splits_on_paragraphs() {
        let chunker = SizeChunker::new(30);
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird one.";
        let chunks = chunker.split_text(text);
        assert_eq!(
            chunks,
            vec![
                "First paragraph here.".to_string(),
                "Second paragraph here.".to_string(),
                "Third one.".to_string(),
            ]
        );
    }

    #[test]
    fn test_splits_long_paragraph_on_sentences() {
        let chunker = SizeChunker::new(25);
        let text = "One short sentence. Two short sentence. Three!";
        let chunks = chunker.split_text(text);
        assert_eq!(chunks[0], "One short sentence.");
        assert_eq!(chunks[1], "Two short sentence.");
        assert_eq!(chunks[2], "Three!");
    }

    #[test]
    fn test_hard_split_without_whitespace() {
        let chunker = SizeChunker::new(4);
        let chunks = chunker.split_text("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_chunks_never_exceed_bound() {
        let chunker = SizeChunker::new(50);
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. "
            .repeat(40)
            + "\n\n"
            + &"세계".repeat(80);
        let chunks = chunker.split_text(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50, "chunk too long: {}", chunk);
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn test_chunk_inherits_metadata() {
        let chunker = SizeChunker::new(10);
        let docs = vec![
            Document::new("alpha beta gamma", DocumentMetadata::for_file("a.pdf").with_page(1)),
            Document::new("", DocumentMetadata::for_file("empty.txt")),
            Document::new("delta", DocumentMetadata::for_file("b.txt")),
        ];

        let chunks = chunker.chunk(&docs);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].metadata.page_label, Some(1));
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[2].metadata.file_name.as_deref(), Some("b.txt"));
        assert_eq!(chunks[2].chunk_index, 0);
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let chunker = SizeChunker::new(0);
        assert_eq!(chunker.chunk_size(), 1);
    }
}
