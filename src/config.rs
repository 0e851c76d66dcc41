//! 설정 모듈
//!
//! 청킹, 인덱싱, 검색, 생성, 플래시카드 관련 값을 한 곳에서 주입합니다.
//! 파일 위치: <데이터 디렉토리>/config.toml (없으면 기본값)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RagError, RagResult};
use crate::knowledge::ChunkConfig;
use crate::prompt::{default_format_table, FormatPolicy};

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (로컬 데이터 폴더 아래 .study-rag)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".study-rag")
}

// ============================================================================
// Sections
// ============================================================================

/// 인덱싱/검색 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// 임베딩 배치 크기 (청크 수)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// 동시에 진행할 배치 수
    #[serde(default = "default_embed_concurrency")]
    pub embed_concurrency: usize,
    /// 검색 시 가져올 최대 이웃 수
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_batch_size() -> usize {
    100
}

fn default_embed_concurrency() -> usize {
    1
}

fn default_top_k() -> usize {
    30
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            embed_concurrency: default_embed_concurrency(),
            top_k: default_top_k(),
        }
    }
}

/// 임베딩 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// 출력 차원 (768, 1536, 3072)
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_dimension() -> usize {
    crate::embedding::DEFAULT_DIMENSION
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dimension: default_dimension() }
    }
}

/// 생성 백엔드 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Gemini generateContent (응답에 프롬프트 없음)
    Gemini,
    /// OpenAI 호환 /completions, echo 사용 (응답이 프롬프트로 시작)
    Completion,
}

/// 텍스트 생성 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default = "default_model")]
    pub model: String,
    /// Completion 백엔드 주소
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_backend() -> BackendKind {
    BackendKind::Gemini
}

fn default_model() -> String {
    "gemini-2.0-flash".into()
}

fn default_base_url() -> String {
    "http://localhost:8000/v1".into()
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
        }
    }
}

/// 플래시카드 생성 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardConfig {
    /// 컨텍스트로 사용할 앞쪽 청크 수
    #[serde(default = "default_chunk_limit")]
    pub chunk_limit: usize,
    /// 컨텍스트 토큰 상한 (1 토큰 ~ 4 문자로 환산)
    #[serde(default = "default_context_tokens")]
    pub context_tokens: usize,
    /// 반환할 최대 카드 수
    #[serde(default = "default_max_cards")]
    pub max_cards: usize,
}

fn default_chunk_limit() -> usize {
    30
}

fn default_context_tokens() -> usize {
    2048
}

fn default_max_cards() -> usize {
    5
}

impl Default for FlashcardConfig {
    fn default() -> Self {
        Self {
            chunk_limit: default_chunk_limit(),
            context_tokens: default_context_tokens(),
            max_cards: default_max_cards(),
        }
    }
}

// ============================================================================
// Root Config
// ============================================================================

/// 루트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default)]
    pub chunking: ChunkConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub flashcards: FlashcardConfig,
    /// 답변 형식 -> (지시문, 최대 길이)
    ///
    /// 파일에 적은 항목은 기본 테이블의 같은 이름 항목만 덮어씁니다.
    #[serde(default = "default_format_table")]
    pub formats: BTreeMap<String, FormatPolicy>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkConfig::default(),
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            flashcards: FlashcardConfig::default(),
            formats: default_format_table(),
        }
    }
}

impl RagConfig {
    /// 기본 경로에서 로드, 없으면 기본값
    pub fn load() -> RagResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// 지정 경로에서 로드
    pub fn load_from(path: &Path) -> RagResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// TOML 문자열에서 파싱 후 검증
    pub fn from_toml(content: &str) -> RagResult<Self> {
        let mut config: Self = toml::from_str(content)
            .map_err(|e| RagError::Config(format!("Failed to parse config: {e}")))?;
        config.formats = merge_formats(std::mem::take(&mut config.formats));
        config.validate()?;
        Ok(config)
    }

    /// 기본 설정 파일 경로
    pub fn default_path() -> PathBuf {
        get_data_dir().join("config.toml")
    }

    /// 값 범위 검증
    pub fn validate(&self) -> RagResult<()> {
        let chunking = &self.chunking;
        if chunking.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be positive".into()));
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunking.chunk_overlap, chunking.chunk_size
            )));
        }
        if self.index.batch_size == 0 {
            return Err(RagError::Config("batch_size must be positive".into()));
        }
        if self.index.embed_concurrency == 0 {
            return Err(RagError::Config("embed_concurrency must be positive".into()));
        }
        if self.index.top_k == 0 {
            return Err(RagError::Config("top_k must be positive".into()));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(RagError::Config(format!(
                "temperature {} out of range 0.0..=2.0",
                self.generation.temperature
            )));
        }
        Ok(())
    }
}

/// 기본 형식 테이블 위에 사용자 항목 덮어쓰기
fn merge_formats(overrides: BTreeMap<String, FormatPolicy>) -> BTreeMap<String, FormatPolicy> {
    let mut formats = default_format_table();
    formats.extend(overrides);
    formats
}

// ============================================================================
// Tests
// ============================================================================
