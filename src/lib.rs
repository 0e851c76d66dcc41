//! study-rag - 개인 학습 자료 기반 RAG 학습 도우미
//!
//! 평문 학습 자료를 단어 단위로 청킹하고 임베딩해서 메모리 L2 인덱스에 넣은 뒤,
//! 질문과 가까운 청크를 컨텍스트로 답변, 노트, 플래시카드를 생성합니다.

pub mod assistant;
pub mod cli;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod error;
pub mod export;
pub mod flashcard;
pub mod generation;
pub mod knowledge;
pub mod prompt;

// Re-exports
pub use assistant::StudyAssistant;
pub use collector::{CollectedDocument, FileCollector};
pub use config::{get_data_dir, RagConfig};
pub use embedding::{get_api_key, has_api_key, EmbeddingProvider, GeminiEmbedding};
pub use error::{render, RagError, RagResult};
pub use export::{ExportFormat, LocalExporter, NoteExporter};
pub use flashcard::{parse_flashcards, Flashcard, FlashcardParser};
pub use generation::{GenerationInvoker, GenerationRequest, Generator, TextGeneration};
pub use knowledge::{
    default_chunker, AddReport, ChunkConfig, Chunker, FlatL2Index, KnowledgeBase, Retriever,
    RetrievedChunk, VectorIndex, WordChunker,
};
pub use prompt::{AnswerFormat, Prompt, PromptComposer};
