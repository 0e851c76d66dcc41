//! 노트 내보내기 모듈
//!
//! 형식 태그를 검증하고 exporter에게 위임합니다.
//! 기본 `LocalExporter`는 txt/json만 직접 씁니다. pdf, word, excel, chart는
//! 별도 exporter를 주입해야 합니다.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{RagError, RagResult};

// ============================================================================
// Export Format
// ============================================================================

/// 내보내기 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Txt,
    Pdf,
    Word,
    Json,
    Excel,
    Chart,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Word => "word",
            ExportFormat::Json => "json",
            ExportFormat::Excel => "excel",
            ExportFormat::Chart => "chart",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = RagError;

    /// 대소문자 무시
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" => Ok(ExportFormat::Txt),
            "pdf" => Ok(ExportFormat::Pdf),
            "word" => Ok(ExportFormat::Word),
            "json" => Ok(ExportFormat::Json),
            "excel" => Ok(ExportFormat::Excel),
            "chart" => Ok(ExportFormat::Chart),
            _ => Err(RagError::UnsupportedFormat(s.to_string())),
        }
    }
}

// ============================================================================
// NoteExporter Trait
// ============================================================================

/// 노트 내보내기 트레이트
#[async_trait]
pub trait NoteExporter: Send + Sync {
    async fn export(&self, notes: &str, path: &Path, format: ExportFormat) -> RagResult<()>;
}

/// txt/json 파일을 직접 쓰는 기본 exporter
#[derive(Debug, Clone, Default)]
pub struct LocalExporter;

#[derive(Serialize)]
struct JsonNotes<'a> {
    notes: &'a str,
}

#[async_trait]
impl NoteExporter for LocalExporter {
    async fn export(&self, notes: &str, path: &Path, format: ExportFormat) -> RagResult<()> {
        let content = match format {
            ExportFormat::Txt => notes.to_string(),
            ExportFormat::Json => serde_json::to_string_pretty(&JsonNotes { notes })
                .map_err(|e| RagError::Io(std::io::Error::other(e)))?,
            other => return Err(RagError::ExporterUnavailable(other)),
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, content).await?;

        tracing::info!("Exported notes as {} to {:?}", format, path);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
