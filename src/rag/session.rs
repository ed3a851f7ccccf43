//! 세션 상태 - 채팅 기록과 요약 캐시
//!
//! 채팅 기록은 추가만 가능하며 하나의 UI 세션과 섹션(페이지)에 속합니다.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::cache::LruMap;
use crate::error::Result;
use crate::llm::Role;

// ============================================================================
// Transcript
// ============================================================================

/// 채팅 한 턴
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// 추가 전용 채팅 기록
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatTranscript {
    turns: Vec<ChatTurn>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(ChatTurn {
            role,
            content: content.into(),
            created_at: Utc::now(),
        });
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content);
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content);
    }

    /// 실패를 assistant 턴 `Error: ...`로 기록
    pub fn push_error(&mut self, error: impl fmt::Display) {
        self.push(Role::Assistant, format!("Error: {}", error));
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// 질문/답변 결과를 기록에 반영
///
/// 성공: user 턴 + assistant 턴. 실패: 사용자 안내 문구로 에러 턴만 추가.
pub fn record_exchange(transcript: &mut ChatTranscript, question: &str, result: &Result<String>) {
    match result {
        Ok(answer) => {
            transcript.push_user(question);
            transcript.push_assistant(answer.clone());
        }
        Err(e) => transcript.push_error(e.user_message()),
    }
}

// ============================================================================
// Session Store
// ============================================================================

/// 세션 하나의 상태
#[derive(Debug, Default)]
pub struct SessionState {
    /// 섹션 키 → 채팅 기록
    transcripts: HashMap<String, ChatTranscript>,
    /// 파일 이름 → 요약
    summaries: HashMap<String, String>,
}

impl SessionState {
    /// 섹션 기록 (없으면 생성)
    pub fn transcript_mut(&mut self, section: &str) -> &mut ChatTranscript {
        self.transcripts.entry(section.to_string()).or_default()
    }

    pub fn transcript(&self, section: &str) -> Option<&ChatTranscript> {
        self.transcripts.get(section)
    }

    pub fn summary(&self, file_name: &str) -> Option<&str> {
        self.summaries.get(file_name).map(String::as_str)
    }

    pub fn store_summary(&mut self, file_name: impl Into<String>, summary: impl Into<String>) {
        self.summaries.insert(file_name.into(), summary.into());
    }

    /// 저장된 요약 전부 삭제
    pub fn clear_summaries(&mut self) -> usize {
        let count = self.summaries.len();
        self.summaries.clear();
        count
    }
}

/// 기본 최대 세션 수
pub const DEFAULT_MAX_SESSIONS: usize = 256;

/// 세션 ID → 세션 상태
///
/// 최대 개수를 넘으면 가장 오래 사용되지 않은 세션을 버립니다.
/// 세션은 `create`로만 생기며 모르는 ID는 조회되지 않습니다.
#[derive(Debug)]
pub struct SessionStore {
    sessions: LruMap<SessionState>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: LruMap::new(max_sessions),
        }
    }

    /// 새 세션 생성 후 ID 반환
    pub fn create(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        if let Some((evicted, _)) = self.sessions.insert(id.clone(), SessionState::default()) {
            tracing::debug!("Evicted idle session {}", evicted);
        }
        id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains(id)
    }

    /// 조회 (최근 사용 갱신 없음)
    pub fn get(&self, id: &str) -> Option<&SessionState> {
        self.sessions.peek(id)
    }

    /// 가변 조회 (최근 사용으로 표시)
    pub fn get_mut(&mut self, id: &str) -> Option<&mut SessionState> {
        self.sessions.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
