//! HTTP 핸들러

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::knowledge::Collection;
use crate::rag::{record_exchange, ChatTurn, PromptKey, SummaryMode};

use super::error::ApiError;
use super::state::AppState;

const INDEX_HTML: &str = include_str!("index.html");

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub session_id: String,
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub session_id: String,
    #[serde(default)]
    pub mode: SummaryMode,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session_id = state.sessions.lock().await.create();
    tracing::debug!("Created session {}", session_id);
    Json(json!({ "session_id": session_id }))
}

pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = &state.config;
    let (documents, nodes) = match state.prepared_directory() {
        Some(data) => (Some(data.documents.len()), Some(data.node_count())),
        None => (None, None),
    };

    Json(json!({
        "model": config.model,
        "embed_model": config.embed_model,
        "data_dir": config.data_dir.display().to_string(),
        "chunk_size": config.chunk_size,
        "api_key_set": config.has_api_key(),
        "documents": documents,
        "nodes": nodes,
    }))
}

/// 데이터 폴더 기반 질의응답
pub async fn ask_data(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = validate_question(&req.question)?;
    ensure_session(&state, &req.session_id).await?;

    let result = async {
        let pipeline = state.pipeline().await?;
        let data = state.directory_data().await?;
        let empty = Collection::new("empty");
        let collection = data.collection.as_ref().unwrap_or(&empty);
        pipeline
            .get_answer(question, collection, PromptKey::RagPdfsData)
            .await
    }
    .await;

    let body =
        exchange_response(&state, &req.session_id, PromptKey::RagPdfsData, question, result).await?;
    Ok(Json(body))
}

/// 파일 업로드 (multipart `file` 필드, 여러 개 가능)
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Missing file name".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let uploaded = state.ingest_upload(file_name, bytes.to_vec()).await?;
        files.push(json!({
            "file_id": uploaded.file_id,
            "file_name": uploaded.file_name,
            "documents": uploaded.data.documents.len(),
            "nodes": uploaded.data.node_count(),
            "preview": uploaded.preview,
        }));
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest("No file uploaded".to_string()));
    }

    Ok(Json(json!({ "files": files })))
}

/// 업로드 파일 기반 질의응답
pub async fn ask_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    Json(req): Json<AskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = validate_question(&req.question)?;
    ensure_session(&state, &req.session_id).await?;
    let uploaded = state
        .upload(&file_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Unknown file: {}", file_id)))?;

    let result = async {
        let pipeline = state.pipeline().await?;
        let empty = Collection::new("empty");
        let collection = uploaded.data.collection.as_ref().unwrap_or(&empty);
        pipeline
            .get_answer(question, collection, PromptKey::RagPdf)
            .await
    }
    .await;

    let body =
        exchange_response(&state, &req.session_id, PromptKey::RagPdf, question, result).await?;
    Ok(Json(body))
}

/// 업로드 파일 요약 (세션별로 파일 이름 기준 캐시)
pub async fn summarize_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    Json(req): Json<SummaryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let uploaded = state
        .upload(&file_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Unknown file: {}", file_id)))?;

    {
        let mut sessions = state.sessions.lock().await;
        let session = sessions
            .get_mut(&req.session_id)
            .ok_or_else(|| unknown_session(&req.session_id))?;
        if let Some(summary) = session.summary(&uploaded.file_name) {
            return Ok(Json(json!({
                "file_name": uploaded.file_name,
                "summary": summary,
                "notice": Value::Null,
                "cached": true,
            })));
        }
    }

    let pipeline = state.pipeline().await?;
    let summary = pipeline
        .get_summary(&uploaded.data.documents, req.mode)
        .await;

    if summary.is_ok() {
        if let Some(session) = state.sessions.lock().await.get_mut(&req.session_id) {
            session.store_summary(uploaded.file_name.clone(), summary.text.clone());
        }
    }

    Ok(Json(json!({
        "file_name": uploaded.file_name,
        "summary": summary.text,
        "notice": summary.notice,
        "cached": false,
    })))
}

/// 업로드 파일 삭제
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.remove_upload(&file_id).await {
        return Err(ApiError::NotFound(format!("Unknown file: {}", file_id)));
    }
    tracing::info!("Removed upload {}", file_id);
    Ok(Json(json!({ "deleted": file_id })))
}

/// 저장된 요약 전부 삭제
pub async fn clear_summaries(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cleared = state
        .sessions
        .lock()
        .await
        .get_mut(&session_id)
        .ok_or_else(|| unknown_session(&session_id))?
        .clear_summaries();
    tracing::info!("Erased {} saved summaries for session {}", cleared, session_id);
    Ok(Json(json!({ "cleared": cleared })))
}

/// 섹션 채팅 기록
pub async fn messages(
    State(state): State<Arc<AppState>>,
    Path((session_id, section)): Path<(String, String)>,
) -> impl IntoResponse {
    let sessions = state.sessions.lock().await;
    let turns: Vec<ChatTurn> = sessions
        .get(&session_id)
        .and_then(|s| s.transcript(&section))
        .map(|t| t.turns().to_vec())
        .unwrap_or_default();
    Json(json!({ "messages": turns }))
}

// ============================================================================
// Helpers
// ============================================================================

fn validate_question(question: &str) -> Result<&str, ApiError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Question must not be empty".to_string()));
    }
    Ok(question)
}

fn unknown_session(session_id: &str) -> ApiError {
    ApiError::NotFound(format!("Unknown session: {}", session_id))
}

async fn ensure_session(state: &AppState, session_id: &str) -> Result<(), ApiError> {
    if state.sessions.lock().await.contains(session_id) {
        Ok(())
    } else {
        Err(unknown_session(session_id))
    }
}

/// 결과를 기록에 반영하고 응답 본문 생성
async fn exchange_response(
    state: &AppState,
    session_id: &str,
    section: PromptKey,
    question: &str,
    result: crate::error::Result<String>,
) -> Result<Value, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let transcript = sessions
        .get_mut(session_id)
        .ok_or_else(|| unknown_session(session_id))?
        .transcript_mut(section.as_str());
    record_exchange(transcript, question, &result);

    let (answer, error) = match result {
        Ok(answer) => (Some(answer), None),
        Err(e) => (None, Some(e.user_message())),
    };

    Ok(json!({
        "answer": answer,
        "error": error,
        "messages": transcript.turns(),
    }))
}
