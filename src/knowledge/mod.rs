//! Knowledge 모듈 - 세션 단위 검색 지식 저장소
//!
//! - Chunker: 단어 윈도우 분할
//! - Index: 메모리 내 flat L2 벡터 인덱스
//! - Store: 청크 목록 + 인덱스 쌍 (배치 임베딩, 롤백)
//! - Retriever: k-NN 컨텍스트 조립

mod chunker;
mod index;
mod retriever;
mod store;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use chunker::{default_chunker, word_chunker, ChunkConfig, Chunker, WordChunker};
pub use index::{squared_l2, FlatL2Index, Neighbor, VectorIndex};
pub use retriever::{join_chunks, Retriever};
pub use store::{AddReport, BatchFailure, KnowledgeBase, KnowledgeStats, RetrievedChunk};
