//! CLI 모듈
//!
//! docrag CLI 명령어 정의 및 구현

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::collector::FileCollector;
use crate::config::AppConfig;
use crate::llm::Role;
use crate::rag::{record_exchange, ChatTranscript, DataSource, Pipeline, PromptKey, SummaryMode};

const API_KEY_HELP: &str = "API 키가 설정되지 않았습니다.\n\n\
     설정 방법:\n  \
     export API_KEY=your-api-key\n  \
     또는 .env 파일에 API_KEY=your-api-key\n\n\
     API 키 발급: https://console.mistral.ai/api-keys";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "docrag")]
#[command(version, about = "문서 질의응답 RAG 데모 (Mistral)", long_about = None)]
pub struct Cli {
    /// 데이터 폴더 (RAG_DATA_DIR 대신 사용)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// 청크 크기 (문자 수)
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 웹 UI 실행
    Serve {
        /// 바인드 주소 (예: 127.0.0.1:8501)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// 질문 한 번 하기
    Ask {
        /// 질문
        question: String,

        /// 데이터 폴더 대신 사용할 파일 (PDF 또는 텍스트)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// 안내문 없이 `질문:청크 ?` 형태의 프롬프트 사용
        #[arg(long)]
        plain: bool,
    },

    /// 데이터 폴더와 대화 (exit / quit 으로 종료)
    Chat,

    /// 파일 요약
    Summarize {
        /// 요약할 파일
        file: PathBuf,

        /// 청크별 요약 후 통합
        #[arg(long)]
        map_reduce: bool,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::from_env().context("설정 로드 실패")?;

    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(size) = cli.chunk_size {
        if size == 0 {
            bail!("--chunk-size는 1 이상이어야 합니다");
        }
        config.chunk_size = size;
    }

    match cli.command {
        Commands::Serve { bind } => cmd_serve(config, bind).await,
        Commands::Ask {
            question,
            file,
            plain,
        } => cmd_ask(&config, &question, file, plain).await,
        Commands::Chat => cmd_chat(&config).await,
        Commands::Summarize { file, map_reduce } => {
            let mode = if map_reduce {
                SummaryMode::MapReduce
            } else {
                SummaryMode::Whole
            };
            cmd_summarize(&config, &file, mode).await
        }
        Commands::Status => cmd_status(&config),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 웹 UI 명령어 (serve)
async fn cmd_serve(mut config: AppConfig, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.bind = bind;
    }

    if !config.has_api_key() {
        println!("[!] API 키 미설정: 질문/요약 요청은 실패합니다.");
    }

    println!("[*] 웹 UI 시작: http://{}", config.bind);
    crate::server::serve(config)
        .await
        .context("웹 서버 실행 실패")
}

/// 질문 명령어 (ask)
///
/// 파일을 지정하면 해당 파일만, 아니면 데이터 폴더 전체를 검색합니다.
async fn cmd_ask(
    config: &AppConfig,
    question: &str,
    file: Option<PathBuf>,
    plain: bool,
) -> Result<()> {
    let pipeline = build_pipeline(config)?;

    let (source, prompt_key) = match file {
        Some(path) => (upload_source(&path).await?, PromptKey::RagPdf),
        None => (
            DataSource::Directory(config.data_dir.clone()),
            PromptKey::RagPdfsData,
        ),
    };
    let prompt_key = if plain { PromptKey::Plain } else { prompt_key };

    println!("[*] 문서 로드 및 인덱싱 중...");
    let data = pipeline
        .prepare_data(source, true)
        .await
        .context("데이터 준비 실패")?;
    println!(
        "[OK] 문서 {} 건, 청크 {} 개",
        data.documents.len(),
        data.node_count()
    );

    let Some(collection) = data.collection.as_ref() else {
        bail!("컬렉션이 생성되지 않았습니다");
    };

    println!("[*] 질문: \"{}\"", question);
    let answer = pipeline
        .get_answer(question, collection, prompt_key)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("답변 생성 실패")?;

    println!("\n{}", answer);
    Ok(())
}

/// 대화 명령어 (chat)
///
/// 데이터 폴더를 한 번 인덱싱한 뒤 표준 입력에서 질문을 반복해서 받습니다.
async fn cmd_chat(config: &AppConfig) -> Result<()> {
    let pipeline = build_pipeline(config)?;

    println!("[*] 데이터 폴더 로드 중: {}", config.data_dir.display());
    let data = pipeline
        .prepare_data(DataSource::Directory(config.data_dir.clone()), true)
        .await
        .context("데이터 준비 실패")?;
    let Some(collection) = data.collection.as_ref() else {
        bail!("컬렉션이 생성되지 않았습니다");
    };

    println!(
        "[OK] 문서 {} 건, 청크 {} 개 (모델: {})",
        data.documents.len(),
        data.node_count(),
        data.model
    );
    println!("     종료하려면 exit 또는 quit 입력\n");

    let mut transcript = ChatTranscript::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }

        let result = pipeline
            .get_answer(question, collection, PromptKey::RagPdfsData)
            .await;
        match &result {
            Ok(answer) => println!("{}\n", answer),
            Err(e) => println!("[!] {}\n", e.user_message()),
        }
        record_exchange(&mut transcript, question, &result);
    }

    let asked: Vec<_> = transcript
        .turns()
        .iter()
        .filter(|t| t.role == Role::User)
        .collect();
    println!("\n[OK] 대화 종료: 질문 {} 개", asked.len());
    for turn in asked {
        println!("  - {}", truncate_text(&turn.content, 60));
    }

    Ok(())
}

/// 요약 명령어 (summarize)
async fn cmd_summarize(config: &AppConfig, file: &Path, mode: SummaryMode) -> Result<()> {
    let pipeline = build_pipeline(config)?;

    println!("[*] 파일 로드 중: {}", file.display());
    let data = pipeline
        .prepare_data(upload_source(file).await?, false)
        .await
        .context("파일 로드 실패")?;

    println!("[*] 요약 중 ({} 페이지)...", data.documents.len());
    let summary = pipeline.get_summary(&data.documents, mode).await;

    match summary.notice {
        Some(notice) => println!("[!] {}", notice),
        None => println!("\n{}", summary.text),
    }

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(config: &AppConfig) -> Result<()> {
    println!("docrag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 모델: {} (임베딩: {:?} / {})", config.model, config.embedding, config.embed_model);
    println!("[*] 청크 크기: {} 자", config.chunk_size);

    if config.has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export API_KEY=your-key");
    }

    println!("[*] 데이터 폴더: {}", config.data_dir.display());
    match FileCollector::with_defaults().collect_directory(&config.data_dir) {
        Ok(files) => {
            let total: u64 = files.iter().map(|f| f.size).sum();
            println!(
                "[OK] 지원 파일: {} 개 ({})",
                files.len(),
                format_bytes(total as usize)
            );
        }
        Err(e) => println!("[!] {}", e),
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn build_pipeline(config: &AppConfig) -> Result<Pipeline> {
    if !config.has_api_key() {
        bail!(API_KEY_HELP);
    }
    Pipeline::from_config(config).context("파이프라인 초기화 실패")
}

/// 로컬 파일을 업로드 출처로 읽기
async fn upload_source(path: &Path) -> Result<DataSource> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("파일 읽기 실패: {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("잘못된 파일 이름: {}", path.display()))?;

    Ok(DataSource::Upload { file_name, bytes })
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("what is the net profit", 7), "what is...");
        assert_eq!(truncate_text("line one\nline two", 20), "line one line two");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_parse_ask_with_file() {
        let cli = Cli::try_parse_from(["docrag", "ask", "What is X?", "--file", "paper.pdf"]).unwrap();
        match cli.command {
            Commands::Ask {
                question,
                file,
                plain,
            } => {
                assert_eq!(question, "What is X?");
                assert_eq!(file, Some(PathBuf::from("paper.pdf")));
                assert!(!plain);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_parse_ask_plain() {
        let cli = Cli::try_parse_from(["docrag", "ask", "Who?", "--plain"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ask {
                plain: true,
                file: None,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_global_overrides() {
        let cli = Cli::try_parse_from([
            "docrag",
            "summarize",
            "paper.pdf",
            "--map-reduce",
            "--data-dir",
            "/tmp/docs",
            "--chunk-size",
            "800",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/docs")));
        assert_eq!(cli.chunk_size, Some(800));
        assert!(matches!(cli.command, Commands::Summarize { map_reduce: true, .. }));
    }

    #[tokio::test]
    async fn test_upload_source_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        match upload_source(&path).await.unwrap() {
            DataSource::Upload { file_name, bytes } => {
                assert_eq!(file_name, "notes.txt");
                assert_eq!(bytes, b"hello");
            }
            _ => panic!("expected upload"),
        }
    }
}
