//! 프롬프트 템플릿

use serde::{Deserialize, Serialize};

/// 검색된 청크가 없을 때의 고정 답변
pub const NO_RESULTS: &str = "No results found in the database.";

/// 질의응답 프롬프트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptKey {
    /// `{question}:{content} ?`
    #[serde(rename = "plain")]
    Plain,
    /// 업로드된 단일 파일 기반 답변
    #[serde(rename = "RAG_PDF")]
    RagPdf,
    /// 데이터 폴더의 여러 파일 기반 답변
    #[serde(rename = "RAG_PDFs_data")]
    RagPdfsData,
}

impl PromptKey {
    /// 세션 섹션 키로도 쓰이는 이름
    pub fn as_str(self) -> &'static str {
        match self {
            PromptKey::Plain => "plain",
            PromptKey::RagPdf => "RAG_PDF",
            PromptKey::RagPdfsData => "RAG_PDFs_data",
        }
    }

    /// 템플릿에 값 채우기
    pub fn render(self, question: &str, content: &str, filename: &str, page_number: &str) -> String {
        match self {
            PromptKey::Plain => format!("{}:{} ?", question, content),
            PromptKey::RagPdf => format!(
                "I want you to answer a question based on a chunk of a retrieved file \
                 that I will give you. If you don't find the answer in the text that \
                 I give you, answer: 'I don't find anything in the corresponding text'. \
                 First write the page number from the PDF:{page_number} if there is one, \
                 then answer the question: {question} with the text: {content}."
            ),
            PromptKey::RagPdfsData => format!(
                "I want you to answer a question based on information retrieved across \
                 multiple PDFs. If you don't find the answer in the texts that I give \
                 you, answer: 'I don't find anything in the corresponding texts'. \
                 First, write the source file name:{filename} and the page number \
                 from the PDF:{page_number}, then answer the question: {question} \
                 using the relevant text: {content}."
            ),
        }
    }
}

/// 전체 문서 요약 프롬프트
pub fn summary_prompt(text: &str) -> String {
    format!(
        "Make a summary written in the third person plural 'they' of the following \
         scientific paper PDF:{text} and write it in the following form: the title, \
         the authors, an abstract, the main contribution, the key findings, and a conclusion."
    )
}

/// 청크 단위 요약 프롬프트 (map 단계)
pub fn chunk_summary_prompt(index: usize, chunk: &str) -> String {
    format!("Make a summary of the chunk PDF number {}:{}", index, chunk)
}

/// 청크 요약 통합 프롬프트 (reduce 단계)
pub fn combine_summaries_prompt(summaries: &[String]) -> String {
    let joined = summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] {}", i, s))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Make a summary of all the following PDF chunk summaries:\n{}", joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_prompt() {
        let prompt = PromptKey::Plain.render("Who?", "Alice did it", "x", "y");
        assert_eq!(prompt, "Who?:Alice did it ?");
    }

    #[test]
    fn test_rag_pdf_prompt_contains_fields() {
        let prompt = PromptKey::RagPdf.render("What is X?", "X is Y.", "paper.pdf", "4");
        assert!(prompt.contains("PDF:4 if there is one"));
        assert!(prompt.contains("question: What is X? with the text: X is Y."));
        assert!(prompt.contains("'I don't find anything in the corresponding text'"));
        assert!(!prompt.contains("paper.pdf"));
    }

    #[test]
    fn test_rag_pdfs_data_prompt_contains_fields() {
        let prompt = PromptKey::RagPdfsData.render("Q", "C", "report.pdf", "Unknown");
        assert!(prompt.contains("source file name:report.pdf"));
        assert!(prompt.contains("page number from the PDF:Unknown"));
        assert!(prompt.ends_with("using the relevant text: C."));
    }

    #[test]
    fn test_prompt_key_serde_names() {
        assert_eq!(serde_json::to_string(&PromptKey::RagPdf).unwrap(), "\"RAG_PDF\"");
        let key: PromptKey = serde_json::from_str("\"RAG_PDFs_data\"").unwrap();
        assert_eq!(key, PromptKey::RagPdfsData);
        assert_eq!(key.as_str(), "RAG_PDFs_data");
    }

    #[test]
    fn test_summary_prompts() {
        assert!(summary_prompt("BODY").contains("scientific paper PDF:BODY and write it"));
        assert_eq!(chunk_summary_prompt(2, "abc"), "Make a summary of the chunk PDF number 2:abc");
        let combined = combine_summaries_prompt(&["one".to_string(), "two".to_string()]);
        assert!(combined.ends_with("[0] one\n[1] two"));
    }
}
