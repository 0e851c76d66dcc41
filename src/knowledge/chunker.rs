//! Text Chunking Module
//!
//! 단어 단위의 고정 크기 윈도우로 텍스트를 분할합니다.
//! 인접 윈도우는 `chunk_overlap` 단어만큼 겹칩니다.

use serde::{Deserialize, Serialize};

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// 윈도우 크기 (단어 수)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// 오버랩 크기 (단어 수, chunk_size 미만)
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    2000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl ChunkConfig {
    /// 윈도우 이동 간격
    pub fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap).max(1)
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// WordChunker
// ============================================================================

/// 단어 윈도우 청커
///
/// 공백 기준으로 단어를 나눈 뒤 `chunk_size` 단어씩 묶습니다.
/// 다음 윈도우는 `step = chunk_size - chunk_overlap` 만큼 뒤에서 시작하며,
/// 마지막 단어를 포함한 윈도우에서 멈추므로 앞 윈도우에 완전히
/// 포함되는 꼬리 윈도우는 생기지 않습니다.
#[derive(Debug, Clone)]
pub struct WordChunker {
    config: ChunkConfig,
}

impl WordChunker {
    /// 설정으로 생성
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// 기본 설정으로 생성 (2000 단어, 200 오버랩)
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }
}

impl Chunker for WordChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return vec![];
        }

        let size = self.config.chunk_size.max(1);
        let step = self.config.step();
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + size).min(words.len());
            chunks.push(words[start..end].join(" "));

            if end >= words.len() {
                break;
            }
            start += step;
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "WordChunker"
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 기본 청커 생성
pub fn default_chunker() -> Box<dyn Chunker> {
    Box::new(WordChunker::with_defaults())
}

/// 설정을 지정한 청커 생성
pub fn word_chunker(config: ChunkConfig) -> Box<dyn Chunker> {
    Box::new(WordChunker::new(config))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    fn expected_count(w: usize, size: usize, overlap: usize) -> usize {
        if w == 0 {
            return 0;
        }
        let step = size - overlap;
        let span = w.saturating_sub(overlap);
        // W <= overlap 인 짧은 문서도 청크 1개
        span.div_ceil(step).max(1)
    }

    #[test]
    fn test_chunker_empty() {
        let chunker = WordChunker::with_defaults();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\t  ").is_empty());
    }

    #[test]
    fn test_chunk_small_window() {
        let chunker = WordChunker::new(ChunkConfig {
            chunk_size: 4,
            chunk_overlap: 1,
        });
        let chunks = chunker.chunk("a b c d e f g h i j");

        assert_eq!(chunks, vec!["a b c d", "d e f g", "g h i j"]);
    }

    #[test]
    fn test_chunk_no_overlap() {
        let chunker = WordChunker::new(ChunkConfig {
            chunk_size: 4,
            chunk_overlap: 0,
        });
        let chunks = chunker.chunk("a b c d e f g h");
        assert_eq!(chunks, vec!["a b c d", "e f g h"]);
    }

    #[test]
    fn test_chunk_normalizes_whitespace() {
        let chunker = WordChunker::with_defaults();
        let chunks = chunker.chunk("  alpha\n\nbeta\tgamma  ");
        assert_eq!(chunks, vec!["alpha beta gamma"]);
    }

    #[test]
    fn test_default_chunk_counts() {
        let chunker = WordChunker::with_defaults();
        for w in [1, 50, 199, 200, 201, 1999, 2000, 2001, 3000, 3600, 3700, 5000, 9001] {
            let chunks = chunker.chunk(&words(w));
            assert_eq!(chunks.len(), expected_count(w, 2000, 200), "W = {}", w);
            assert!(chunks.iter().all(|c| c.split(' ').count() <= 2000));
        }
    }

    #[test]
    fn test_overlap_removed_reconstructs_words() {
        let chunker = WordChunker::new(ChunkConfig {
            chunk_size: 7,
            chunk_overlap: 3,
        });
        for w in [1, 3, 6, 7, 8, 20, 31] {
            let text = words(w);
            let chunks = chunker.chunk(&text);

            let mut rebuilt: Vec<String> = Vec::new();
            for (i, chunk) in chunks.iter().enumerate() {
                let skip = if i == 0 { 0 } else { 3 };
                rebuilt.extend(chunk.split(' ').skip(skip).map(str::to_string));
            }
            assert_eq!(rebuilt.join(" "), text, "W = {}", w);
        }
    }

    #[test]
    fn test_default_chunker() {
        let chunker = default_chunker();
        assert_eq!(chunker.name(), "WordChunker");
        assert_eq!(chunker.chunk(&words(2001)).len(), 2);
    }

    #[test]
    fn test_step_never_zero() {
        let config = ChunkConfig {
            chunk_size: 5,
            chunk_overlap: 5,
        };
        assert_eq!(config.step(), 1);
    }
}
