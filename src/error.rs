//! 에러 타입 - 학습 도우미 코어 에러 분류
//!
//! 모든 코어 에러는 값으로 반환됩니다. UI 계층은 `user_message()`로
//! 사람이 읽을 수 있는 안내 문구를 얻어 렌더링합니다.

use thiserror::Error;

use crate::export::ExportFormat;

/// 코어 결과 타입
pub type RagResult<T> = std::result::Result<T, RagError>;

/// 학습 도우미 코어 에러
#[derive(Debug, Error)]
pub enum RagError {
    /// 임베딩 또는 생성 모델이 준비되지 않음
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// 인덱스에 문서가 없음
    #[error("no documents have been indexed")]
    EmptyIndex,

    /// 검색 결과 없음
    #[error("no relevant documents found")]
    EmptyResult,

    /// 청크 배치 임베딩 실패 (롤백 후 AddReport로 보고됨)
    #[error("embedding batch starting at chunk {start} failed: {reason}")]
    BatchEmbeddingFailure { start: usize, reason: String },

    /// 질문 임베딩 실패
    #[error("query embedding failed: {0}")]
    EmbeddingFailure(String),

    /// 임베딩 차원이 인덱스 차원과 불일치
    #[error("embedding dimension mismatch: index has {expected}, batch has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// 텍스트 생성 실패
    #[error("generation failed: {0}")]
    GenerationFailure(String),

    /// 알 수 없는 내보내기 형식
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// 형식은 유효하지만 처리할 exporter가 없음
    #[error("no exporter registered for format: {0}")]
    ExporterUnavailable(ExportFormat),

    /// 설정 오류
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// 사용자에게 보여줄 안내 문구
    pub fn user_message(&self) -> String {
        match self {
            RagError::EmptyIndex => "Please upload some study materials first!".to_string(),
            RagError::EmptyResult => "No relevant documents found.".to_string(),
            RagError::ModelUnavailable(what) => {
                format!("{} is not loaded properly.", what)
            }
            RagError::GenerationFailure(msg) => format!("Error during generation: {}", msg),
            other => other.to_string(),
        }
    }

    /// 사용자 행동으로 해결 가능한 안내성 에러인지
    pub fn is_guidance(&self) -> bool {
        matches!(self, RagError::EmptyIndex | RagError::EmptyResult)
    }
}

/// 실패를 안내 문구로 바꿔 항상 문자열을 돌려줌
pub fn render(result: RagResult<String>) -> String {
    result.unwrap_or_else(|e| e.user_message())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guidance_messages() {
        assert_eq!(
            RagError::EmptyIndex.user_message(),
            "Please upload some study materials first!"
        );
        assert_eq!(
            RagError::EmptyResult.user_message(),
            "No relevant documents found."
        );
        assert!(RagError::EmptyIndex.is_guidance());
        assert!(!RagError::GenerationFailure("boom".into()).is_guidance());
    }

    #[test]
    fn test_render_fails_closed() {
        let failed: RagResult<String> = Err(RagError::GenerationFailure("timeout".into()));
        assert_eq!(render(failed), "Error during generation: timeout");
        assert_eq!(render(Ok("Paris".into())), "Paris");
    }

    #[test]
    fn test_model_unavailable_message() {
        let err = RagError::ModelUnavailable("QA model".into());
        assert_eq!(err.user_message(), "QA model is not loaded properly.");
    }
}
