//! RAG 모듈
//!
//! 문서 로드부터 답변/요약 생성까지의 파이프라인과 세션 상태를 제공합니다.

pub mod pipeline;
pub mod prompts;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use pipeline::{DataSource, Pipeline, PreparedData, Summary, SummaryMode};
pub use prompts::{PromptKey, NO_RESULTS};
pub use session::{record_exchange, ChatTranscript, ChatTurn, SessionState, SessionStore};
