//! 웹 UI 서버
//!
//! 단일 페이지 채팅 UI와 JSON API를 제공합니다.
//!
//! | 경로 | 설명 |
//! |------|------|
//! | `GET /` | 채팅 페이지 |
//! | `GET /api/status` | 모델/데이터 상태 |
//! | `POST /api/sessions` | 세션 생성 |
//! | `POST /api/data/ask` | 데이터 폴더 질의응답 |
//! | `POST /api/upload` | 파일 업로드 및 인덱싱 |
//! | `POST /api/files/:file_id/ask` | 업로드 파일 질의응답 |
//! | `POST /api/files/:file_id/summary` | 업로드 파일 요약 |
//! | `DELETE /api/files/:file_id` | 업로드 파일 삭제 |
//! | `DELETE /api/sessions/:session_id/summaries` | 저장된 요약 삭제 |
//! | `GET /api/sessions/:session_id/:section/messages` | 채팅 기록 |

pub mod error;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::Result;

pub use error::ApiError;
pub use state::{AppState, UploadedFile};

/// 라우터 생성
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/status", get(handlers::status))
        .route("/api/sessions", post(handlers::create_session))
        .route(
            "/api/sessions/:session_id/summaries",
            delete(handlers::clear_summaries),
        )
        .route(
            "/api/sessions/:session_id/:section/messages",
            get(handlers::messages),
        )
        .route("/api/data/ask", post(handlers::ask_data))
        .route("/api/upload", post(handlers::upload))
        .route("/api/files/:file_id", delete(handlers::delete_file))
        .route("/api/files/:file_id/ask", post(handlers::ask_file))
        .route("/api/files/:file_id/summary", post(handlers::summarize_file))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 웹 UI 실행
pub async fn serve(config: AppConfig) -> Result<()> {
    let bind = config.bind.clone();
    let state = Arc::new(AppState::new(config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("Web UI listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
