//! 텍스트 생성 모듈
//!
//! 생성 백엔드는 출력 형태에 따라 두 가지로 나뉩니다.
//! - Seq2Seq: 생성된 텍스트만 돌려줌 -> 그대로 사용
//! - Causal: 프롬프트 + 이어쓰기를 돌려줌 -> 앞의 프롬프트를 잘라냄
//!
//! 모드는 `Generator` 변형으로 고정되며, 호출자는 `generate`만 사용합니다.

mod completion;
mod gemini;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{BackendKind, GenerationConfig};
use crate::error::{RagError, RagResult};
use crate::prompt::Prompt;

pub use completion::CompletionGeneration;
pub use gemini::GeminiGeneration;

// ============================================================================
// TextGeneration Trait
// ============================================================================

/// 생성 요청
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_length: usize,
    /// 샘플링 온도 (0이 아니면 매번 결과가 다를 수 있음)
    pub temperature: f32,
}

/// 생성 백엔드 트레이트
#[async_trait]
pub trait TextGeneration: Send + Sync {
    /// 원시 출력 반환 (모드별 후처리 전)
    async fn complete(&self, request: &GenerationRequest) -> Result<String>;

    /// 백엔드 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Generator
// ============================================================================

/// 출력 형태가 고정된 생성기
#[derive(Clone)]
pub enum Generator {
    /// 생성 텍스트만 반환하는 백엔드
    Seq2Seq(Arc<dyn TextGeneration>),
    /// 프롬프트를 앞에 붙여 반환하는 백엔드
    Causal(Arc<dyn TextGeneration>),
}

impl Generator {
    fn backend(&self) -> &Arc<dyn TextGeneration> {
        match self {
            Generator::Seq2Seq(b) | Generator::Causal(b) => b,
        }
    }

    pub fn name(&self) -> &str {
        self.backend().name()
    }

    /// 생성 후 모드별 정규화
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let output = self.backend().complete(request).await?;
        Ok(match self {
            Generator::Seq2Seq(_) => output,
            Generator::Causal(_) => strip_echo(&output, &request.prompt).to_string(),
        })
    }
}

/// 출력 앞에 붙은 프롬프트 제거 (없으면 그대로)
pub fn strip_echo<'a>(output: &'a str, prompt: &str) -> &'a str {
    output.strip_prefix(prompt).unwrap_or(output)
}

// ============================================================================
// GenerationInvoker
// ============================================================================

/// 생성 호출기
///
/// 생성기가 없거나 백엔드가 실패하면 에러 값을 반환하며 패닉하지 않습니다.
pub struct GenerationInvoker {
    generator: Option<Generator>,
    temperature: f32,
}

impl GenerationInvoker {
    pub fn new(generator: Option<Generator>, temperature: f32) -> Self {
        Self {
            generator,
            temperature,
        }
    }

    pub fn is_available(&self) -> bool {
        self.generator.is_some()
    }

    pub fn generator(&self) -> Option<&Generator> {
        self.generator.as_ref()
    }

    /// 프롬프트로 텍스트 생성
    pub async fn generate(&self, prompt: &Prompt) -> RagResult<String> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| RagError::ModelUnavailable("QA model".into()))?;

        let request = GenerationRequest {
            prompt: prompt.text.clone(),
            max_length: prompt.max_length,
            temperature: self.temperature,
        };

        tracing::debug!(
            "Generating with {} (prompt: {} chars, max_length: {})",
            generator.name(),
            request.prompt.len(),
            request.max_length
        );

        generator.generate(&request).await.map_err(|e| {
            tracing::warn!("Generation failed: {:#}", e);
            RagError::GenerationFailure(format!("{:#}", e))
        })
    }
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 맞는 생성기 생성
pub fn create_generator(config: &GenerationConfig) -> Result<Generator> {
    match config.backend {
        BackendKind::Gemini => {
            let backend = GeminiGeneration::from_env(&config.model)?;
            tracing::info!("Using Gemini generation ({})", config.model);
            Ok(Generator::Seq2Seq(Arc::new(backend)))
        }
        BackendKind::Completion => {
            let backend = CompletionGeneration::new(&config.base_url, &config.model)?;
            tracing::info!(
                "Using completion endpoint {} ({})",
                config.base_url,
                config.model
            );
            Ok(Generator::Causal(Arc::new(backend)))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
