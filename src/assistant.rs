//! 학습 도우미 - 검색 증강 답변 파이프라인
//!
//! 문서 추가 -> 검색 -> 프롬프트 -> 생성 흐름을 세션 단위로 묶습니다.
//! 모든 실패는 `RagError` 값으로 반환되며, 화면에 어떻게 보여줄지는
//! 호출자가 정합니다 (`RagError::user_message`).

use std::path::Path;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::embedding::{create_embedder, EmbeddingProvider};
use crate::error::{RagError, RagResult};
use crate::export::{ExportFormat, LocalExporter, NoteExporter};
use crate::flashcard::{Flashcard, FlashcardParser};
use crate::generation::{create_generator, GenerationInvoker, Generator};
use crate::knowledge::{join_chunks, AddReport, Chunker, KnowledgeBase, Retriever, WordChunker};
use crate::prompt::PromptComposer;

/// 1 토큰 ~ 4 문자 근사
const CHARS_PER_TOKEN: usize = 4;

// ============================================================================
// StudyAssistant
// ============================================================================

/// 세션 단위 학습 도우미
pub struct StudyAssistant {
    config: RagConfig,
    knowledge: Arc<KnowledgeBase>,
    retriever: Retriever,
    composer: PromptComposer,
    invoker: GenerationInvoker,
    parser: FlashcardParser,
    chunker: WordChunker,
    exporter: Box<dyn NoteExporter>,
}

impl StudyAssistant {
    /// 주어진 임베딩/생성 백엔드로 생성
    ///
    /// 둘 다 없어도 생성됩니다. 해당 기능만 `ModelUnavailable`을 반환합니다.
    pub fn new(
        config: RagConfig,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        generator: Option<Generator>,
    ) -> Self {
        let knowledge = Arc::new(KnowledgeBase::new(&config, embedder));
        let retriever = Retriever::new(knowledge.clone(), &config);

        Self {
            composer: PromptComposer::new(config.formats.clone()),
            invoker: GenerationInvoker::new(generator, config.generation.temperature),
            parser: FlashcardParser::new(config.flashcards.max_cards),
            chunker: WordChunker::new(config.chunking.clone()),
            exporter: Box::new(LocalExporter),
            knowledge,
            retriever,
            config,
        }
    }

    /// 설정에 따라 Gemini 임베딩과 생성 백엔드를 준비해서 생성
    ///
    /// 초기화에 실패한 모델은 경고만 남기고 비활성화합니다.
    pub fn from_config(config: RagConfig) -> Self {
        let embedder = create_embedder(config.embedding.dimension)
            .map_err(|e| tracing::warn!("Embedding model unavailable: {:#}", e))
            .ok();

        let generator = create_generator(&config.generation)
            .map_err(|e| tracing::warn!("Generation model unavailable: {:#}", e))
            .ok();

        Self::new(config, embedder, generator)
    }

    /// exporter 교체
    pub fn with_exporter(mut self, exporter: Box<dyn NoteExporter>) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }

    pub fn can_generate(&self) -> bool {
        self.invoker.is_available()
    }

    /// 학습 자료 추가
    pub async fn add_documents(&self, documents: &[String]) -> RagResult<AddReport> {
        self.knowledge.add(documents).await
    }

    /// 질문에 답변
    ///
    /// `context_texts`가 있으면 인덱스 대신 그 텍스트를 컨텍스트로 씁니다.
    pub async fn ask(
        &self,
        question: &str,
        context_texts: Option<&[String]>,
        format: &str,
    ) -> RagResult<String> {
        let context = match context_texts {
            Some(texts) if !texts.is_empty() => self.retriever.context_from_texts(texts),
            _ => self.indexed_context(question).await?,
        };

        let prompt = self.composer.compose(question, &context, format);
        self.invoker.generate(&prompt).await
    }

    /// 주제에 대한 학습 노트 생성
    pub async fn generate_notes(&self, topic: &str) -> RagResult<String> {
        let context = self.indexed_context(topic).await?;
        let prompt = self.composer.notes_prompt(topic, &context);
        self.invoker.generate(&prompt).await
    }

    /// 플래시카드 생성
    ///
    /// `content`가 있으면 그 텍스트에서, 없으면 저장된 앞쪽 청크에서 만듭니다.
    pub async fn generate_flashcards(&self, content: Option<&str>) -> RagResult<Vec<Flashcard>> {
        if !self.invoker.is_available() {
            return Err(RagError::ModelUnavailable("QA model".into()));
        }

        let limit = self.config.flashcards.chunk_limit;
        let chunks = match content {
            Some(text) => self.chunker.chunk(text).into_iter().take(limit).collect(),
            None => self.knowledge.head(limit).await,
        };
        if chunks.is_empty() {
            return Err(RagError::EmptyIndex);
        }

        let context = truncate_context(
            &join_chunks(chunks.iter().map(String::as_str)),
            self.config.flashcards.context_tokens * CHARS_PER_TOKEN,
        );
        tracing::debug!("Flashcard context length: {} chars", context.chars().count());

        let prompt = self.composer.flashcard_prompt(&context);
        let generated = self.invoker.generate(&prompt).await?;

        Ok(self.parser.parse(&generated))
    }

    /// 인덱스 검색 컨텍스트
    ///
    /// 자료 유무, 생성 모델 유무를 먼저 확인한 뒤에만 질문을 임베딩합니다.
    async fn indexed_context(&self, query: &str) -> RagResult<String> {
        if self.knowledge.is_empty().await {
            return Err(RagError::EmptyIndex);
        }
        if !self.invoker.is_available() {
            return Err(RagError::ModelUnavailable("QA model".into()));
        }
        self.retriever.context_for(query).await
    }

    /// 노트 내보내기
    pub async fn export_notes(&self, notes: &str, path: &Path, format: &str) -> RagResult<()> {
        let format: ExportFormat = format.parse()?;
        self.exporter.export(notes, path, format).await
    }
}

/// 문자 수 기준으로 자르고 `...` 표시
pub fn truncate_context(context: &str, max_chars: usize) -> String {
    match context.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &context[..cut]),
        None => context.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
