//! Retriever - 질문에 맞는 컨텍스트 조립
//!
//! 두 가지 경로가 있습니다.
//! - 인덱스 경로: 질문 임베딩 -> k-NN (top_k) -> 거리 오름차순으로 줄바꿈 결합
//! - 직접 지정 경로: 호출자가 준 텍스트를 다시 청킹해서 전부 결합 (top_k 자르기 없음)

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{RagError, RagResult};

use super::chunker::{Chunker, WordChunker};
use super::store::{KnowledgeBase, RetrievedChunk};

/// 컨텍스트 검색기
pub struct Retriever {
    knowledge: Arc<KnowledgeBase>,
    chunker: WordChunker,
    top_k: usize,
}

impl Retriever {
    pub fn new(knowledge: Arc<KnowledgeBase>, config: &RagConfig) -> Self {
        Self {
            knowledge,
            chunker: WordChunker::new(config.chunking.clone()),
            top_k: config.index.top_k.max(1),
        }
    }

    /// 벡터 검색 (거리 오름차순)
    pub async fn search(&self, question: &str) -> RagResult<Vec<RetrievedChunk>> {
        if self.knowledge.is_empty().await {
            return Err(RagError::EmptyIndex);
        }

        // 임베딩 없이 보관된 청크만 있으면 ModelUnavailable
        let embedder = self.knowledge.embedder()?;
        let query = embedder
            .embed(question)
            .await
            .map_err(|e| RagError::EmbeddingFailure(format!("{:#}", e)))?;

        let hits = self.knowledge.nearest(&query, self.top_k).await?;
        if hits.is_empty() {
            return Err(RagError::EmptyResult);
        }

        tracing::debug!(
            "Retrieved {} chunks (closest distance: {:.4})",
            hits.len(),
            hits[0].distance
        );

        Ok(hits)
    }

    /// 인덱스에서 컨텍스트 조립
    pub async fn context_for(&self, question: &str) -> RagResult<String> {
        let hits = self.search(question).await?;
        Ok(join_chunks(hits.iter().map(|h| h.text.as_str())))
    }

    /// 직접 지정한 텍스트로 컨텍스트 조립 (인덱스 우회)
    pub fn context_from_texts<S: AsRef<str>>(&self, texts: &[S]) -> String {
        let chunks: Vec<String> = texts
            .iter()
            .flat_map(|t| self.chunker.chunk(t.as_ref()))
            .collect();
        join_chunks(chunks.iter().map(String::as_str))
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }
}

/// 청크를 줄바꿈으로 결합
pub fn join_chunks<'a>(chunks: impl Iterator<Item = &'a str>) -> String {
    chunks.collect::<Vec<_>>().join("\n")
}

// ============================================================================
// Tests
// ============================================================================
