//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트를 사용하여 PDF에서 페이지별 텍스트를 추출합니다.

use crate::error::{RagError, Result};

/// PDF 바이트에서 페이지별 텍스트 추출
///
/// (페이지 번호, 텍스트) 튜플 벡터를 반환합니다. 페이지 번호는 1부터 시작하며
/// 빈 페이지도 자리를 유지하므로 뒤 페이지 번호가 밀리지 않습니다.
pub fn extract_pages_from_mem(file_name: &str, bytes: &[u8]) -> Result<Vec<(usize, String)>> {
    let extraction_error = |message: String| RagError::Extraction {
        file_name: file_name.to_string(),
        message,
    };

    // pdf-extract는 손상된 입력에서 패닉할 수 있음
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| extraction_error("PDF parser panicked".to_string()))?
        .map_err(|e| extraction_error(e.to_string()))?;

    if pages.iter().all(|p| p.trim().is_empty()) {
        tracing::warn!(
            "No text extracted from PDF: {}. It might be a scanned document.",
            file_name
        );
    }

    if pages.is_empty() {
        return Ok(vec![(1, String::new())]);
    }

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| (i + 1, text.trim().to_string()))
        .collect())
}

/// 테스트용 PDF 생성 (페이지당 한 줄, Courier)
#[cfg(test)]
pub(crate) fn build_test_pdf(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_one_entry_per_page() {
        let bytes = build_test_pdf(&["Alpha page one", "Bravo page two", "Charlie page three"]);
        let pages = extract_pages_from_mem("paper.pdf", &bytes).unwrap();

        assert_eq!(pages.len(), 3);
        let numbers: Vec<usize> = pages.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(pages[0].1.contains("Alpha page one"));
        assert!(pages[1].1.contains("Bravo page two"));
        assert!(!pages[1].1.contains("Alpha"));
        assert!(pages[2].1.contains("Charlie page three"));
    }

    #[test]
    fn test_blank_page_keeps_numbering() {
        let bytes = build_test_pdf(&["First", "", "Third"]);
        let pages = extract_pages_from_mem("gaps.pdf", &bytes).unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1], (2, String::new()));
        assert_eq!(pages[2].0, 3);
        assert!(pages[2].1.contains("Third"));
    }

    #[test]
    fn test_invalid_pdf_is_extraction_error() {
        let result = extract_pages_from_mem("bad.pdf", b"not a pdf");
        assert!(matches!(result, Err(RagError::Extraction { .. })));
    }
}
