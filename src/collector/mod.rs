//! 파일 수집 모듈
//!
//! 로컬 파일 및 폴더에서 이미 추출된 평문 학습 자료(.txt, .md)를 읽습니다.
//! .gitignore 패턴을 존중하며, PDF/DOCX/이미지 등은 건너뜁니다.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;

/// 평문으로 읽는 확장자
const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown"];

/// 평문 자료 확장자인지
pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| TEXT_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

// ============================================================================
// Collected Document
// ============================================================================

/// 읽어온 학습 자료
#[derive(Debug, Clone)]
pub struct CollectedDocument {
    pub path: PathBuf,
    pub text: String,
}

// ============================================================================
// File Collector
// ============================================================================

/// 파일 수집기 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// .gitignore 패턴 존중 여부
    pub respect_gitignore: bool,
    /// 숨김 파일 포함 여부
    pub include_hidden: bool,
    /// 최대 파일 크기 (바이트, 0이면 제한 없음)
    pub max_file_size: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            include_hidden: false,
            max_file_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// 파일 수집기
pub struct FileCollector {
    config: CollectorConfig,
}

impl FileCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(CollectorConfig::default())
    }

    /// 폴더 재귀 탐색 (평문 파일 경로만, 정렬됨)
    pub fn collect_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if !path.is_dir() {
            anyhow::bail!("Not a directory: {:?}", path);
        }

        let walker = WalkBuilder::new(path)
            .hidden(!self.config.include_hidden)
            .git_ignore(self.config.respect_gitignore)
            .git_global(self.config.respect_gitignore)
            .git_exclude(self.config.respect_gitignore)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }

            let file_path = entry.path();
            if !is_text_file(file_path) {
                tracing::debug!("Skipping non-text file: {:?}", file_path);
                continue;
            }
            if self.is_too_large(file_path) {
                continue;
            }
            files.push(file_path.to_path_buf());
        }

        // 실행마다 같은 청크 순서가 되도록 정렬
        files.sort();
        tracing::info!("Collected {} text files from {:?}", files.len(), path);
        Ok(files)
    }

    fn is_too_large(&self, path: &Path) -> bool {
        if self.config.max_file_size == 0 {
            return false;
        }
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > self.config.max_file_size => {
                tracing::debug!("Skipping large file: {:?} ({} bytes)", path, meta.len());
                true
            }
            _ => false,
        }
    }

    /// 파일과 폴더를 받아 평문 자료를 읽음
    ///
    /// 직접 지정한 파일은 확장자와 관계없이 평문으로 읽습니다.
    pub async fn load(&self, files: &[PathBuf], dirs: &[PathBuf]) -> Result<Vec<CollectedDocument>> {
        let mut paths: Vec<PathBuf> = files.to_vec();
        for dir in dirs {
            paths.extend(self.collect_directory(dir)?);
        }

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read text file: {:?}", path))?;

            if text.trim().is_empty() {
                tracing::warn!("Empty document: {:?}", path);
                continue;
            }
            documents.push(CollectedDocument { path, text });
        }

        Ok(documents)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_text_file() {
        assert!(is_text_file(Path::new("notes.md")));
        assert!(is_text_file(Path::new("chapter1.TXT")));
        assert!(!is_text_file(Path::new("slides.pdf")));
        assert!(!is_text_file(Path::new("README")));
    }

    #[test]
    fn test_collector_config_default() {
        let config = CollectorConfig::default();
        assert!(config.respect_gitignore);
        assert!(!config.include_hidden);
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_load_directory_skips_binary_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "# Biology\ncells").unwrap();
        std::fs::write(dir.path().join("a.txt"), "algebra basics").unwrap();
        std::fs::write(dir.path().join("empty.txt"), "   ").unwrap();
        std::fs::write(dir.path().join("scan.pdf"), [0u8, 1, 2]).unwrap();

        let docs = FileCollector::with_defaults()
            .load(&[], &[dir.path().to_path_buf()])
            .await
            .unwrap();

        let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["algebra basics", "# Biology\ncells"]);
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let result = FileCollector::with_defaults()
            .load(&[], &[PathBuf::from("/definitely/not/here")])
            .await;
        assert!(result.is_err());
    }
}
