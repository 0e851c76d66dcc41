//! Knowledge Base - 청크 저장소 + 벡터 인덱스
//!
//! 청크 목록과 벡터 인덱스를 한 쌍으로 소유합니다.
//! 두 쪽의 길이는 항상 같습니다 (청크 위치 == 인덱스 행 번호).
//!
//! - 추가: 잠금 밖에서 배치 임베딩 후, 쓰기 잠금 안에서 한 번에 반영
//! - 검색: 읽기 잠금 안에서 k-NN 수행
//! - 배치 실패: 해당 배치의 청크와 벡터 모두 버림 (롤백)
//! - 임베딩 모델 없음: 청크만 별도 목록에 보관 (검색 제외, 플래시카드용)

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;

use crate::config::RagConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, RagResult};

use super::chunker::{word_chunker, Chunker};
use super::index::{FlatL2Index, VectorIndex};

// ============================================================================
// Types
// ============================================================================

/// 검색된 청크
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    /// 저장소 위치
    pub row: usize,
    /// 제곱 L2 거리
    pub distance: f32,
    /// 청크 텍스트
    pub text: String,
}

/// 실패한 임베딩 배치
#[derive(Debug, Clone)]
pub struct BatchFailure {
    /// 이번 호출의 청크 목록 기준 시작 위치
    pub start: usize,
    /// 배치 청크 수
    pub len: usize,
    pub reason: String,
}

impl BatchFailure {
    pub fn to_error(&self) -> RagError {
        RagError::BatchEmbeddingFailure {
            start: self.start,
            reason: self.reason.clone(),
        }
    }
}

/// add 호출 결과
#[derive(Debug, Clone, Default)]
pub struct AddReport {
    /// 청킹으로 생성된 청크 수
    pub chunks_total: usize,
    /// 실제 저장/인덱싱된 청크 수
    pub chunks_indexed: usize,
    /// 실패해서 버려진 배치
    pub failed_batches: Vec<BatchFailure>,
}

impl AddReport {
    pub fn chunks_dropped(&self) -> usize {
        self.chunks_total - self.chunks_indexed
    }

    pub fn is_complete(&self) -> bool {
        self.failed_batches.is_empty()
    }
}

/// 저장소 통계
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeStats {
    /// 인덱싱된 청크 수
    pub chunk_count: usize,
    pub vector_count: usize,
    /// 임베딩 없이 보관된 청크 수
    pub unembedded_count: usize,
    pub dimension: Option<usize>,
}

/// 잠금으로 보호되는 (청크, 인덱스) 쌍
#[derive(Debug, Default)]
struct IndexState {
    chunks: Vec<String>,
    index: Option<FlatL2Index>,
    /// 검색 대상이 아닌 청크
    unembedded: Vec<String>,
}

impl IndexState {
    fn vector_count(&self) -> usize {
        self.index.as_ref().map(|i| i.len()).unwrap_or(0)
    }
}

/// 임베딩에 성공한 배치
struct EmbeddedBatch {
    start: usize,
    len: usize,
    width: usize,
    vectors: Vec<Vec<f32>>,
}

// ============================================================================
// KnowledgeBase
// ============================================================================

/// 세션 단위 지식 저장소
///
/// 프로세스 전역 상태가 아니라 세션(코퍼스)마다 하나씩 만들어 씁니다.
pub struct KnowledgeBase {
    state: RwLock<IndexState>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Box<dyn Chunker>,
    batch_size: usize,
    concurrency: usize,
}

impl KnowledgeBase {
    /// 설정과 임베딩 프로바이더로 생성
    ///
    /// 프로바이더가 없으면 `add`/검색은 `ModelUnavailable`을 반환합니다.
    pub fn new(config: &RagConfig, embedder: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self {
            state: RwLock::new(IndexState::default()),
            embedder,
            chunker: word_chunker(config.chunking.clone()),
            batch_size: config.index.batch_size.max(1),
            concurrency: config.index.embed_concurrency.max(1),
        }
    }

    /// 임베딩 프로바이더
    pub fn embedder(&self) -> RagResult<&Arc<dyn EmbeddingProvider>> {
        self.embedder
            .as_ref()
            .ok_or_else(|| RagError::ModelUnavailable("Embedding model".into()))
    }

    /// 문서 추가 (청킹 -> 배치 임베딩 -> 반영)
    ///
    /// 실패한 배치는 청크째로 버리고 `AddReport`에 기록합니다.
    /// 차원 불일치는 호출 전체를 실패시키며 아무것도 반영하지 않습니다.
    pub async fn add(&self, documents: &[String]) -> RagResult<AddReport> {
        if documents.is_empty() {
            return Ok(AddReport::default());
        }

        // 1. 문서 순서대로 청킹
        let chunks: Vec<String> = documents
            .iter()
            .flat_map(|doc| self.chunker.chunk(doc))
            .collect();

        let mut report = AddReport {
            chunks_total: chunks.len(),
            ..Default::default()
        };

        if chunks.is_empty() {
            tracing::warn!("No chunks generated from {} documents", documents.len());
            return Ok(report);
        }

        let Some(embedder) = self.embedder.as_ref() else {
            tracing::warn!(
                "Embedding model unavailable, storing {} chunks without vectors",
                chunks.len()
            );
            self.state.write().await.unembedded.extend(chunks);
            return Ok(report);
        };

        // 2. 배치 임베딩 (동시 실행하되 결과는 원래 순서 유지)
        let results: Vec<(usize, usize, anyhow::Result<Vec<Vec<f32>>>)> = stream::iter(
            chunks
                .chunks(self.batch_size)
                .enumerate()
                .map(|(i, batch)| {
                    let start = i * self.batch_size;
                    async move {
                        tracing::debug!("Embedding batch at {} ({} chunks)", start, batch.len());
                        (start, batch.len(), embedder.embed_batch(batch).await)
                    }
                }),
        )
        .buffered(self.concurrency)
        .collect()
        .await;

        // 3. 배치별 검증
        let mut embedded = Vec::new();
        for (start, len, result) in results {
            match validate_batch(start, len, result)? {
                Ok(batch) => embedded.push(batch),
                Err(failure) => {
                    tracing::warn!("{}", failure.to_error());
                    report.failed_batches.push(failure);
                }
            }
        }

        // 4. 쓰기 잠금 안에서 차원 확인 후 일괄 반영
        let mut state = self.state.write().await;

        let expected = state
            .index
            .as_ref()
            .map(|i| i.dimension())
            .or_else(|| embedded.first().map(|b| b.width));

        if let Some(expected) = expected {
            if let Some(bad) = embedded.iter().find(|b| b.width != expected) {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: bad.width,
                });
            }
        }

        for batch in embedded {
            let index = state
                .index
                .get_or_insert_with(|| FlatL2Index::new(batch.width));
            index.add(batch.vectors)?;
            state
                .chunks
                .extend_from_slice(&chunks[batch.start..batch.start + batch.len]);
            report.chunks_indexed += batch.len;
        }

        debug_assert_eq!(state.chunks.len(), state.vector_count());

        tracing::info!(
            "Indexed {}/{} chunks (total rows: {}, failed batches: {})",
            report.chunks_indexed,
            report.chunks_total,
            state.chunks.len(),
            report.failed_batches.len()
        );

        Ok(report)
    }

    /// 쿼리 벡터에 가까운 청크 (읽기 잠금)
    ///
    /// 저장된 행 수보다 많은 이웃은 요청하지 않습니다.
    pub async fn nearest(&self, query: &[f32], top_k: usize) -> RagResult<Vec<RetrievedChunk>> {
        let state = self.state.read().await;

        let index = match state.index.as_ref() {
            Some(index) if !index.is_empty() => index,
            _ => return Err(RagError::EmptyIndex),
        };

        let k = top_k.min(index.len());
        let neighbors = index.search(query, k)?;

        Ok(neighbors
            .into_iter()
            .filter_map(|n| {
                state.chunks.get(n.row).map(|text| RetrievedChunk {
                    row: n.row,
                    distance: n.distance,
                    text: text.clone(),
                })
            })
            .collect())
    }

    /// 앞쪽 청크 n개 (저장 순서, 임베딩 없는 청크 포함)
    pub async fn head(&self, n: usize) -> Vec<String> {
        let state = self.state.read().await;
        state
            .chunks
            .iter()
            .chain(state.unembedded.iter())
            .take(n)
            .cloned()
            .collect()
    }

    /// 저장된 전체 청크 수 (임베딩 없는 청크 포함)
    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state.chunks.len() + state.unembedded.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// 검색 가능한 (인덱싱된) 청크 수
    pub async fn indexed_len(&self) -> usize {
        self.state.read().await.chunks.len()
    }

    /// 저장소 통계
    pub async fn stats(&self) -> KnowledgeStats {
        let state = self.state.read().await;
        KnowledgeStats {
            chunk_count: state.chunks.len(),
            vector_count: state.vector_count(),
            unembedded_count: state.unembedded.len(),
            dimension: state.index.as_ref().map(|i| i.dimension()),
        }
    }
}

/// 배치 결과 검증
///
/// 바깥 `Err`는 호출 전체 실패(배치 내부 차원 불일치),
/// 안쪽 `Err`는 해당 배치만 버림.
fn validate_batch(
    start: usize,
    len: usize,
    result: anyhow::Result<Vec<Vec<f32>>>,
) -> RagResult<Result<EmbeddedBatch, BatchFailure>> {
    let failure = |reason: String| BatchFailure { start, len, reason };

    let vectors = match result {
        Ok(v) => v,
        Err(e) => return Ok(Err(failure(format!("{:#}", e)))),
    };

    if vectors.len() != len {
        return Ok(Err(failure(format!(
            "expected {} vectors, got {}",
            len,
            vectors.len()
        ))));
    }

    let width = vectors.first().map(|v| v.len()).unwrap_or(0);
    if width == 0 {
        return Ok(Err(failure("empty embedding vectors".to_string())));
    }

    if let Some(bad) = vectors.iter().find(|v| v.len() != width) {
        return Err(RagError::DimensionMismatch {
            expected: width,
            actual: bad.len(),
        });
    }

    Ok(Ok(EmbeddedBatch {
        start,
        len,
        width,
        vectors,
    }))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::testing::{FailingEmbedding, KeywordEmbedding};

    fn small_config(batch_size: usize) -> RagConfig {
        let mut config = RagConfig::default();
        config.chunking.chunk_size = 4;
        config.chunking.chunk_overlap = 1;
        config.index.batch_size = batch_size;
        config
    }

    #[tokio::test]
    async fn test_add_empty_is_noop() {
        let kb = KnowledgeBase::new(&RagConfig::default(), Some(Arc::new(KeywordEmbedding)));
        let report = kb.add(&[]).await.unwrap();
        assert_eq!(report.chunks_total, 0);
        assert!(kb.is_empty().await);
        assert_eq!(kb.stats().await.dimension, None);
    }

    #[tokio::test]
    async fn test_add_keeps_store_and_index_aligned() {
        let kb = KnowledgeBase::new(&small_config(2), Some(Arc::new(KeywordEmbedding)));
        let docs = vec!["a b c d e f g".to_string(), "h i".to_string()];

        let report = kb.add(&docs).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.chunks_total, 3);

        let stats = kb.stats().await;
        assert_eq!(stats.chunk_count, 3);
        assert_eq!(stats.vector_count, 3);
        assert_eq!(kb.head(10).await, vec!["a b c d", "d e f g", "h i"]);
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back_its_chunks() {
        // 두 번째 배치("d e f g" 포함)만 실패
        let embedder = Arc::new(FailingEmbedding::on_text_containing("d e f g"));
        let kb = KnowledgeBase::new(&small_config(1), Some(embedder));
        let docs = vec!["a b c d e f g".to_string(), "h i".to_string()];

        let report = kb.add(&docs).await.unwrap();
        assert_eq!(report.chunks_total, 3);
        assert_eq!(report.chunks_indexed, 2);
        assert_eq!(report.chunks_dropped(), 1);
        assert_eq!(report.failed_batches.len(), 1);
        assert_eq!(report.failed_batches[0].start, 1);

        let stats = kb.stats().await;
        assert_eq!(stats.chunk_count, stats.vector_count);
        assert_eq!(kb.head(10).await, vec!["a b c d", "h i"]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_commits_nothing() {
        let kb = KnowledgeBase::new(&small_config(100), Some(Arc::new(KeywordEmbedding)));
        kb.add(&["first doc".to_string()]).await.unwrap();

        let wide = KnowledgeBase {
            embedder: Some(Arc::new(FailingEmbedding::with_width(3))),
            ..kb
        };
        let result = wide.add(&["second doc".to_string()]).await;

        assert!(matches!(result, Err(RagError::DimensionMismatch { .. })));
        assert_eq!(wide.len().await, 1);
        assert_eq!(wide.stats().await.vector_count, 1);
    }

    #[tokio::test]
    async fn test_add_without_embedder_stores_unembedded() {
        let kb = KnowledgeBase::new(&small_config(100), None);
        let docs = vec!["a b c d e f g".to_string(), "h i".to_string()];

        let report = kb.add(&docs).await.unwrap();
        assert_eq!(report.chunks_total, 3);
        assert_eq!(report.chunks_indexed, 0);
        assert!(report.is_complete());

        assert_eq!(kb.len().await, 3);
        assert_eq!(kb.indexed_len().await, 0);
        assert_eq!(kb.head(2).await, vec!["a b c d", "d e f g"]);

        let stats = kb.stats().await;
        assert_eq!(stats.chunk_count, stats.vector_count);
        assert_eq!(stats.unembedded_count, 3);
        assert_eq!(stats.dimension, None);

        // 검색 대상 아님
        assert!(matches!(
            kb.nearest(&[0.0; 8], 30).await,
            Err(RagError::EmptyIndex)
        ));
    }

    #[tokio::test]
    async fn test_nearest_on_empty() {
        let kb = KnowledgeBase::new(&RagConfig::default(), Some(Arc::new(KeywordEmbedding)));
        let result = kb.nearest(&[0.0; 8], 30).await;
        assert!(matches!(result, Err(RagError::EmptyIndex)));
    }

    #[tokio::test]
    async fn test_concurrent_batches_keep_order() {
        let mut config = small_config(1);
        config.index.embed_concurrency = 4;
        let kb = KnowledgeBase::new(&config, Some(Arc::new(KeywordEmbedding)));

        let docs: Vec<String> = (0..6).map(|i| format!("doc{}", i)).collect();
        kb.add(&docs).await.unwrap();

        assert_eq!(kb.head(10).await, docs);
    }
}
