//! CLI 모듈
//!
//! study-rag CLI 명령어 정의 및 구현
//!
//! 인덱스는 저장되지 않으므로 명령어마다 지정한 자료로 세션을 새로 만듭니다.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::assistant::StudyAssistant;
use crate::collector::FileCollector;
use crate::config::{get_data_dir, BackendKind, RagConfig};
use crate::embedding::has_api_key;
use crate::error::RagError;
use crate::flashcard::Flashcard;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "study-rag")]
#[command(version, about = "개인 학습 자료 기반 RAG 학습 도우미", long_about = None)]
pub struct Cli {
    /// 설정 파일 경로 (기본: <데이터 디렉토리>/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 학습 자료 지정
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// 학습 자료 파일 (여러 번 지정 가능)
    #[arg(long = "file")]
    pub files: Vec<PathBuf>,

    /// 학습 자료 폴더 (재귀, 여러 번 지정 가능)
    #[arg(short, long = "dir")]
    pub dirs: Vec<PathBuf>,
}

impl SourceArgs {
    fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// 학습 자료에 대해 질문
    Ask {
        /// 질문
        question: String,

        #[command(flatten)]
        sources: SourceArgs,

        /// 답변 형식 (full, short_summary, bullet_points, long_answer, one_word, short_answer)
        #[arg(long, default_value = "full")]
        format: String,

        /// 인덱스 대신 컨텍스트로 직접 사용할 파일
        #[arg(long = "context")]
        context: Vec<PathBuf>,
    },

    /// 주제에 대한 학습 노트 생성
    Notes {
        /// 주제
        topic: String,

        #[command(flatten)]
        sources: SourceArgs,

        /// 노트를 저장할 경로
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 저장 형식 (txt, json, pdf, word, excel, chart)
        #[arg(long, default_value = "txt")]
        export_format: String,
    },

    /// 플래시카드 생성
    Flashcards {
        #[command(flatten)]
        sources: SourceArgs,

        /// 이 파일 내용만으로 카드 생성
        #[arg(long)]
        content: Option<PathBuf>,

        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 텍스트 파일을 노트 형식으로 내보내기
    Export {
        /// 노트 텍스트 파일
        input: PathBuf,

        /// 저장 경로
        #[arg(short, long)]
        output: PathBuf,

        /// 저장 형식
        #[arg(short, long, default_value = "txt")]
        format: String,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ask {
            question,
            sources,
            format,
            context,
        } => cmd_ask(config, &question, &sources, &format, &context).await,
        Commands::Notes {
            topic,
            sources,
            output,
            export_format,
        } => cmd_notes(config, &topic, &sources, output.as_deref(), &export_format).await,
        Commands::Flashcards {
            sources,
            content,
            json,
        } => cmd_flashcards(config, &sources, content.as_deref(), json).await,
        Commands::Export {
            input,
            output,
            format,
        } => cmd_export(config, &input, &output, &format).await,
        Commands::Status => cmd_status(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<RagConfig> {
    let config = match path {
        Some(p) => RagConfig::load_from(p),
        None => RagConfig::load(),
    };
    config.context("설정 로드 실패")
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 세션 생성 후 학습 자료 색인
async fn build_session(config: RagConfig, sources: &SourceArgs) -> Result<StudyAssistant> {
    let assistant = StudyAssistant::from_config(config);

    if sources.is_empty() {
        return Ok(assistant);
    }

    let documents = FileCollector::with_defaults()
        .load(&sources.files, &sources.dirs)
        .await
        .context("학습 자료 읽기 실패")?;

    if documents.is_empty() {
        println!("[!] 읽을 수 있는 학습 자료가 없습니다 (.txt, .md)");
        return Ok(assistant);
    }

    println!("[*] 학습 자료 {} 개 색인 중...", documents.len());
    let texts: Vec<String> = documents.into_iter().map(|d| d.text).collect();

    match assistant.add_documents(&texts).await {
        Ok(report) => {
            println!(
                "[OK] 청크 {} 개 색인 (전체 {} 개)",
                report.chunks_indexed, report.chunks_total
            );
            if report.chunks_indexed == 0 && report.is_complete() {
                println!("[!] 임베딩 모델 없음: 검색은 불가, 플래시카드 생성에만 사용됩니다");
            }
            for failure in &report.failed_batches {
                println!(
                    "[!] 배치 실패로 청크 {} 개 제외 (시작 위치 {}): {}",
                    failure.len, failure.start, failure.reason
                );
            }
        }
        Err(e) => println!("[!] 색인 실패: {}", e.user_message()),
    }

    Ok(assistant)
}

/// 질문 명령어 (ask)
async fn cmd_ask(
    config: RagConfig,
    question: &str,
    sources: &SourceArgs,
    format: &str,
    context: &[PathBuf],
) -> Result<()> {
    let assistant = build_session(config, sources).await?;

    let context_texts = if context.is_empty() {
        None
    } else {
        Some(
            FileCollector::with_defaults()
                .load(context, &[])
                .await
                .context("컨텍스트 파일 읽기 실패")?
                .into_iter()
                .map(|d| d.text)
                .collect::<Vec<_>>(),
        )
    };

    println!("[*] 질문: \"{}\" ({})", question, format);
    let result = assistant
        .ask(question, context_texts.as_deref(), format)
        .await;
    print_answer(result);
    Ok(())
}

/// 노트 명령어 (notes)
async fn cmd_notes(
    config: RagConfig,
    topic: &str,
    sources: &SourceArgs,
    output: Option<&Path>,
    export_format: &str,
) -> Result<()> {
    let assistant = build_session(config, sources).await?;

    println!("[*] 노트 생성 중: \"{}\"", topic);
    let notes = match assistant.generate_notes(topic).await {
        Ok(notes) => notes,
        Err(e) => {
            println!("\n[!] {}", e.user_message());
            return Ok(());
        }
    };

    println!("\n{}\n", notes.trim());

    if let Some(path) = output {
        report_export(assistant.export_notes(&notes, path, export_format).await, path);
    }

    Ok(())
}

/// 플래시카드 명령어 (flashcards)
async fn cmd_flashcards(
    config: RagConfig,
    sources: &SourceArgs,
    content: Option<&Path>,
    json: bool,
) -> Result<()> {
    let assistant = build_session(config, sources).await?;

    let content_text = match content {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("파일 읽기 실패: {:?}", path))?,
        ),
        None => None,
    };

    let cards = match assistant.generate_flashcards(content_text.as_deref()).await {
        Ok(cards) => cards,
        Err(e) => {
            println!("[!] {}", e.user_message());
            return Ok(());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }

    print_flashcards(&cards);
    Ok(())
}

/// 내보내기 명령어 (export)
async fn cmd_export(config: RagConfig, input: &Path, output: &Path, format: &str) -> Result<()> {
    let notes = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("파일 읽기 실패: {:?}", input))?;

    let assistant = StudyAssistant::new(config, None, None);
    let result = assistant.export_notes(&notes, output, format).await;

    if let Err(RagError::UnsupportedFormat(ref tag)) = result {
        bail!("지원하지 않는 형식: {} (txt, pdf, word, json, excel, chart)", tag);
    }
    report_export(result, output);
    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(config: &RagConfig) -> Result<()> {
    println!("study-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    let config_path = RagConfig::default_path();
    println!("[*] 데이터 디렉토리: {}", get_data_dir().display());
    if config_path.exists() {
        println!("[OK] 설정 파일: {}", config_path.display());
    } else {
        println!("[*] 설정 파일 없음, 기본값 사용");
    }

    if has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export GEMINI_API_KEY=your-key");
    }

    let backend = match config.generation.backend {
        BackendKind::Gemini => "gemini",
        BackendKind::Completion => "completion",
    };
    println!(
        "[*] 생성 모델: {} ({}), temperature {}",
        config.generation.model, backend, config.generation.temperature
    );
    println!(
        "[*] 청킹: {} 단어 / 오버랩 {} 단어, 배치 {}, top-k {}",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
        config.index.batch_size,
        config.index.top_k
    );

    let mut formats: Vec<String> = config
        .formats
        .iter()
        .map(|(name, policy)| format!("{}({})", name, policy.max_length))
        .collect();
    formats.sort();
    println!("[*] 답변 형식: {}", formats.join(", "));

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn print_answer(result: Result<String, RagError>) {
    match result {
        Ok(answer) => println!("\n{}", answer.trim()),
        Err(e) => println!("\n[!] {}", e.user_message()),
    }
}

fn report_export(result: Result<(), RagError>, path: &Path) {
    match result {
        Ok(()) => println!("[OK] 저장됨: {}", path.display()),
        Err(e) => println!("[!] 저장 실패: {}", e.user_message()),
    }
}

fn print_flashcards(cards: &[Flashcard]) {
    if cards.is_empty() {
        println!("[!] 생성된 플래시카드가 없습니다.");
        return;
    }

    println!("[OK] 플래시카드 {} 장:\n", cards.len());
    for (i, card) in cards.iter().enumerate() {
        println!("{}. Q: {}", i + 1, truncate_text(&card.question, 200));
        println!("   A: {}", truncate_text(&card.answer, 200));
        println!();
    }
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

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
    }

    #[test]
    fn test_parse_ask_arguments() {
        let cli = Cli::parse_from([
            "study-rag",
            "ask",
            "What is algebra?",
            "--dir",
            "notes",
            "--file",
            "a.txt",
            "--file",
            "b.md",
            "--format",
            "one_word",
        ]);

        match cli.command {
            Commands::Ask {
                question,
                sources,
                format,
                context,
            } => {
                assert_eq!(question, "What is algebra?");
                assert_eq!(sources.dirs, vec![PathBuf::from("notes")]);
                assert_eq!(sources.files.len(), 2);
                assert_eq!(format, "one_word");
                assert!(context.is_empty());
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_parse_global_config() {
        let cli = Cli::parse_from(["study-rag", "status", "--config", "my.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_flashcards_defaults() {
        let cli = Cli::parse_from(["study-rag", "flashcards", "-d", "docs"]);
        match cli.command {
            Commands::Flashcards { sources, content, json } => {
                assert_eq!(sources.dirs, vec![PathBuf::from("docs")]);
                assert!(content.is_none());
                assert!(!json);
            }
            _ => panic!("expected flashcards"),
        }
    }
}
