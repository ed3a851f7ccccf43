//! 웹 서버 공유 상태
//!
//! 파이프라인과 데이터 폴더 컬렉션은 처음 필요할 때 한 번만 만들어집니다.
//! 업로드 파일은 (파일 이름, 내용)의 SHA-256으로 메모이즈되어 같은 파일을 다시
//! 임베딩하지 않습니다. 세션과 업로드는 개수 제한 LRU로 보관합니다.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, OnceCell};

use crate::cache::LruMap;
use crate::collector::FileType;
use crate::config::AppConfig;
use crate::error::{RagError, Result};
use crate::rag::{DataSource, Pipeline, PreparedData, SessionStore};

/// 업로드되어 인덱싱된 파일
pub struct UploadedFile {
    pub file_id: String,
    pub file_name: String,
    pub data: PreparedData,
    /// PDF 미리보기 (`data:application/pdf;base64,...`)
    pub preview: Option<String>,
}

/// 애플리케이션 상태
pub struct AppState {
    pub config: AppConfig,
    pipeline: OnceCell<Arc<Pipeline>>,
    directory: OnceCell<Arc<PreparedData>>,
    uploads: Mutex<LruMap<Arc<UploadedFile>>>,
    pub sessions: Mutex<SessionStore>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self::with_optional_pipeline(config, None)
    }

    /// 미리 만든 파이프라인으로 생성
    pub fn with_pipeline(config: AppConfig, pipeline: Pipeline) -> Self {
        Self::with_optional_pipeline(config, Some(Arc::new(pipeline)))
    }

    fn with_optional_pipeline(config: AppConfig, pipeline: Option<Arc<Pipeline>>) -> Self {
        Self {
            pipeline: OnceCell::new_with(pipeline),
            directory: OnceCell::new(),
            uploads: Mutex::new(LruMap::new(config.max_uploads)),
            sessions: Mutex::new(SessionStore::new(config.max_sessions)),
            config,
        }
    }

    /// 공유 파이프라인 (최초 호출 시 생성)
    pub async fn pipeline(&self) -> Result<Arc<Pipeline>> {
        self.pipeline
            .get_or_try_init(|| async { Pipeline::from_config(&self.config).map(Arc::new) })
            .await
            .cloned()
    }

    /// 데이터 폴더 컬렉션 (최초 호출 시 로드 + 인덱싱, 실패는 캐시하지 않음)
    pub async fn directory_data(&self) -> Result<Arc<PreparedData>> {
        self.directory
            .get_or_try_init(|| async {
                let pipeline = self.pipeline().await?;
                let data = pipeline
                    .prepare_data(DataSource::Directory(self.config.data_dir.clone()), true)
                    .await?;
                Ok::<_, RagError>(Arc::new(data))
            })
            .await
            .cloned()
    }

    /// 이미 준비된 데이터 폴더 컬렉션
    pub fn prepared_directory(&self) -> Option<&Arc<PreparedData>> {
        self.directory.get()
    }

    /// 업로드 파일 인덱싱 (같은 이름과 내용이면 캐시 반환)
    pub async fn ingest_upload(&self, file_name: String, bytes: Vec<u8>) -> Result<Arc<UploadedFile>> {
        let file_id = content_id(&file_name, &bytes);

        if let Some(existing) = self.uploads.lock().await.get(&file_id) {
            tracing::debug!("Reusing indexed upload {} ({})", existing.file_name, file_id);
            return Ok(Arc::clone(existing));
        }

        let preview = match FileType::from_path(std::path::Path::new(&file_name)) {
            Some(FileType::Pdf) => Some(pdf_data_url(&bytes)),
            _ => None,
        };

        let pipeline = self.pipeline().await?;
        let data = pipeline
            .prepare_data(
                DataSource::Upload {
                    file_name: file_name.clone(),
                    bytes,
                },
                true,
            )
            .await?;

        tracing::info!(
            "Indexed upload {} ({} documents, {} nodes)",
            file_name,
            data.documents.len(),
            data.node_count()
        );

        let uploaded = Arc::new(UploadedFile {
            file_id: file_id.clone(),
            file_name,
            data,
            preview,
        });

        if let Some((evicted, _)) = self
            .uploads
            .lock()
            .await
            .insert(file_id, Arc::clone(&uploaded))
        {
            tracing::debug!("Evicted least recently used upload {}", evicted);
        }
        Ok(uploaded)
    }

    pub async fn upload(&self, file_id: &str) -> Option<Arc<UploadedFile>> {
        self.uploads.lock().await.get(file_id).cloned()
    }

    /// 업로드 파일 삭제
    pub async fn remove_upload(&self, file_id: &str) -> bool {
        self.uploads.lock().await.remove(file_id).is_some()
    }
}

/// 파일 ID: 파일 이름과 내용의 SHA-256 hex
pub fn content_id(file_name: &str, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// PDF 인라인 미리보기용 data URL
pub fn pdf_data_url(bytes: &[u8]) -> String {
    format!("data:application/pdf;base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::testing::{pipeline_with, FakeChatModel};

    #[test]
    fn test_content_id_depends_on_name_and_bytes() {
        let id = content_id("a.txt", b"abc");
        assert_eq!(id.len(), 64);
        assert_eq!(id, content_id("a.txt", b"abc"));
        assert_ne!(id, content_id("b.txt", b"abc"));
        assert_ne!(id, content_id("a.txt", b"abd"));
    }

    #[test]
    fn test_pdf_data_url() {
        assert_eq!(pdf_data_url(b"%PDF"), "data:application/pdf;base64,JVBERg==");
    }

    #[tokio::test]
    async fn test_pipeline_requires_api_key() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(state.pipeline().await, Err(RagError::MissingApiKey)));
    }

    #[tokio::test]
    async fn test_upload_is_memoised_by_name_and_content() {
        let (pipeline, _) = pipeline_with(FakeChatModel::answering("ok"));
        let state = AppState::with_pipeline(AppConfig::default(), pipeline);

        let first = state
            .ingest_upload("a.txt".to_string(), b"same bytes".to_vec())
            .await
            .unwrap();
        let again = state
            .ingest_upload("a.txt".to_string(), b"same bytes".to_vec())
            .await
            .unwrap();
        let renamed = state
            .ingest_upload("b.txt".to_string(), b"same bytes".to_vec())
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert_ne!(first.file_id, renamed.file_id);
        assert_eq!(renamed.file_name, "b.txt");
        assert!(first.preview.is_none());
        assert!(state.upload(&first.file_id).await.is_some());
    }

    #[tokio::test]
    async fn test_uploads_are_capped_and_removable() {
        let (pipeline, _) = pipeline_with(FakeChatModel::answering("ok"));
        let config = AppConfig {
            max_uploads: 2,
            ..AppConfig::default()
        };
        let state = AppState::with_pipeline(config, pipeline);

        let a = state.ingest_upload("a.txt".into(), b"alpha".to_vec()).await.unwrap();
        let b = state.ingest_upload("b.txt".into(), b"bravo".to_vec()).await.unwrap();
        assert!(state.upload(&a.file_id).await.is_some());
        let c = state.ingest_upload("c.txt".into(), b"charlie".to_vec()).await.unwrap();

        assert!(state.upload(&a.file_id).await.is_some());
        assert!(state.upload(&b.file_id).await.is_none());
        assert!(state.upload(&c.file_id).await.is_some());

        assert!(state.remove_upload(&c.file_id).await);
        assert!(!state.remove_upload(&c.file_id).await);
        assert!(state.upload(&c.file_id).await.is_none());
    }

    #[tokio::test]
    async fn test_pdf_upload_has_preview_and_pages() {
        let (pipeline, _) = pipeline_with(FakeChatModel::answering("ok"));
        let state = AppState::with_pipeline(AppConfig::default(), pipeline);
        let bytes = crate::extractor::pdf::build_test_pdf(&["One", "Two"]);

        let uploaded = state.ingest_upload("paper.pdf".into(), bytes).await.unwrap();
        assert_eq!(uploaded.data.documents.len(), 2);
        assert!(uploaded
            .preview
            .as_deref()
            .unwrap()
            .starts_with("data:application/pdf;base64,JVBERi"));
    }

    #[tokio::test]
    async fn test_directory_failure_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline_with(FakeChatModel::answering("ok"));
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        let state = AppState::with_pipeline(config, pipeline);

        assert!(state.directory_data().await.is_err());
        assert!(state.prepared_directory().is_none());

        std::fs::write(dir.path().join("doc.txt"), "now there is text").unwrap();
        let data = state.directory_data().await.unwrap();
        assert_eq!(data.documents.len(), 1);
    }
}
