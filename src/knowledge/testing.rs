//! 테스트용 결정적 임베딩 프로바이더

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;

pub const KEYWORD_DIMENSION: usize = 8;

/// 단어별 바이트 합을 버킷으로 쓰는 bag-of-words 임베딩
pub struct KeywordEmbedding;

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; KEYWORD_DIMENSION];
    for word in text.split_whitespace() {
        let bucket = word.bytes().map(usize::from).sum::<usize>() % KEYWORD_DIMENSION;
        v[bucket] += 1.0;
    }
    v
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(keyword_vector(text))
    }

    fn dimension(&self) -> usize {
        KEYWORD_DIMENSION
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// 특정 텍스트가 든 배치를 실패시키는 임베딩
pub struct FailingEmbedding {
    fail_on: Option<String>,
    width: usize,
}

impl FailingEmbedding {
    pub fn on_text_containing(needle: &str) -> Self {
        Self {
            fail_on: Some(needle.to_string()),
            width: KEYWORD_DIMENSION,
        }
    }

    pub fn with_width(width: usize) -> Self {
        Self {
            fail_on: None,
            width,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                anyhow::bail!("simulated embedding outage");
            }
        }
        Ok(vec![1.0; self.width])
    }

    fn dimension(&self) -> usize {
        self.width
    }

    fn name(&self) -> &str {
        "failing"
    }
}
