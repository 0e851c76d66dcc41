//! 프롬프트 구성 모듈
//!
//! 답변 형식별 지시문/최대 길이 정책과 최종 프롬프트 조립을 담당합니다.
//! 조립 순서는 항상 지시문 -> 안내 문구 -> 컨텍스트 -> 질문입니다.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Answer Format
// ============================================================================

/// 답변 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerFormat {
    Full,
    ShortSummary,
    BulletPoints,
    LongAnswer,
    OneWord,
    ShortAnswer,
}

impl AnswerFormat {
    pub const ALL: [AnswerFormat; 6] = [
        AnswerFormat::Full,
        AnswerFormat::ShortSummary,
        AnswerFormat::BulletPoints,
        AnswerFormat::LongAnswer,
        AnswerFormat::OneWord,
        AnswerFormat::ShortAnswer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerFormat::Full => "full",
            AnswerFormat::ShortSummary => "short_summary",
            AnswerFormat::BulletPoints => "bullet_points",
            AnswerFormat::LongAnswer => "long_answer",
            AnswerFormat::OneWord => "one_word",
            AnswerFormat::ShortAnswer => "short_answer",
        }
    }

    /// 기본 정책
    pub fn default_policy(&self) -> FormatPolicy {
        let (instruction, max_length) = match self {
            AnswerFormat::Full => (
                "You are a helpful AI study assistant. Answer the question in a friendly, \
                 conversational tone, providing detailed information from the context as if \
                 explaining to a curious student.",
                2048,
            ),
            AnswerFormat::ShortSummary => (
                "You are a helpful AI study assistant. Provide a concise summary of the key \
                 points from the context in 2-3 sentences, in a friendly and engaging way.",
                1024,
            ),
            AnswerFormat::BulletPoints => (
                "You are a helpful AI study assistant. Extract and present the main information \
                 from the context in clear bullet points, making it easy to read.",
                1024,
            ),
            AnswerFormat::LongAnswer => (
                "You are a helpful AI study assistant. Provide a long and detailed answer, \
                 elaborating on all relevant aspects from the context in a conversational manner.",
                2048,
            ),
            AnswerFormat::OneWord => (
                "You are a helpful AI study assistant. Provide a single word answer based on \
                 the context.",
                20,
            ),
            AnswerFormat::ShortAnswer => (
                "You are a helpful AI study assistant. Provide a brief answer in one or two \
                 sentences based on the context, in a friendly tone.",
                1024,
            ),
        };

        FormatPolicy {
            instruction: instruction.to_string(),
            max_length,
        }
    }
}

impl fmt::Display for AnswerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnswerFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown answer format: {}", s))
    }
}

/// 형식별 정책 (지시문, 최대 출력 길이)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatPolicy {
    pub instruction: String,
    pub max_length: usize,
}

/// 기본 형식 테이블
pub fn default_format_table() -> BTreeMap<String, FormatPolicy> {
    AnswerFormat::ALL
        .into_iter()
        .map(|f| (f.as_str().to_string(), f.default_policy()))
        .collect()
}

// ============================================================================
// Prompts
// ============================================================================

/// 질문 프롬프트 안내 문구
const QUESTION_FRAMING: &str =
    "Based on the provided context, answer the following educational question accurately.";

/// 노트 생성 최대 길이
pub const NOTES_MAX_LENGTH: usize = 2048;

/// 플래시카드 생성 최대 길이
pub const FLASHCARD_MAX_LENGTH: usize = 2048;

/// 플래시카드 few-shot 예시 (파서가 그대로 읽을 수 있는 형식)
pub const FLASHCARD_EXAMPLES: &str = "Flashcard 1:
Question: What is the capital of France?
Answer: Paris

Flashcard 2:
Question: What is 2+2?
Answer: 4

Flashcard 3:
Question: What is the color of the sky?
Answer: Blue

Flashcard 4:
Question: What is the largest planet?
Answer: Jupiter

Flashcard 5:
Question: What is water made of?
Answer: Hydrogen and oxygen";

/// 생성 요청 한 건
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub max_length: usize,
}

// ============================================================================
// PromptComposer
// ============================================================================

/// 형식 테이블 기반 프롬프트 조립기
#[derive(Debug, Clone)]
pub struct PromptComposer {
    formats: BTreeMap<String, FormatPolicy>,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(default_format_table())
    }
}

impl PromptComposer {
    pub fn new(formats: BTreeMap<String, FormatPolicy>) -> Self {
        Self { formats }
    }

    /// 형식 이름으로 정책 조회
    ///
    /// 모르는 형식은 `full` 정책으로 대체합니다 (에러 아님).
    pub fn policy(&self, format: &str) -> FormatPolicy {
        self.formats
            .get(format)
            .or_else(|| self.formats.get(AnswerFormat::Full.as_str()))
            .cloned()
            .unwrap_or_else(|| AnswerFormat::Full.default_policy())
    }

    /// 질문 프롬프트 조립
    pub fn compose(&self, question: &str, context: &str, format: &str) -> Prompt {
        let policy = self.policy(format);
        Prompt {
            text: format!(
                "{} {} Context: {} Question: {}",
                policy.instruction, QUESTION_FRAMING, context, question
            ),
            max_length: policy.max_length,
        }
    }

    /// 학습 노트 프롬프트
    pub fn notes_prompt(&self, topic: &str, context: &str) -> Prompt {
        Prompt {
            text: format!(
                "Generate detailed study notes on the following topic based on the context:\n\n\
                 Context: {}\n\nTopic: {}\n\nNotes:",
                context, topic
            ),
            max_length: NOTES_MAX_LENGTH,
        }
    }

    /// 플래시카드 프롬프트 (정확히 5장 요청)
    pub fn flashcard_prompt(&self, context: &str) -> Prompt {
        Prompt {
            text: format!(
                "Generate 5 flashcards from the following study material. Each flashcard must \
                 have a question and answer. Format your response exactly like this example:\n\n\
                 {}\n\nContext: {}\n\nFlashcards:",
                FLASHCARD_EXAMPLES, context
            ),
            max_length: FLASHCARD_MAX_LENGTH,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_length_per_format() {
        let composer = PromptComposer::default();
        let expected = [
            ("full", 2048),
            ("short_summary", 1024),
            ("bullet_points", 1024),
            ("long_answer", 2048),
            ("one_word", 20),
            ("short_answer", 1024),
        ];
        for (format, max_length) in expected {
            assert_eq!(composer.policy(format).max_length, max_length, "{}", format);
        }
    }

    #[test]
    fn test_unknown_format_falls_back_to_full() {
        let composer = PromptComposer::default();
        assert_eq!(composer.policy("haiku"), composer.policy("full"));
        assert_eq!(composer.policy("").max_length, 2048);
    }

    #[test]
    fn test_fallback_without_full_entry() {
        let mut table = BTreeMap::new();
        table.insert(
            "terse".to_string(),
            FormatPolicy {
                instruction: "Be terse.".into(),
                max_length: 5,
            },
        );
        let composer = PromptComposer::new(table);
        assert_eq!(composer.policy("terse").max_length, 5);
        assert_eq!(composer.policy("other"), AnswerFormat::Full.default_policy());
    }

    #[test]
    fn test_compose_order() {
        let composer = PromptComposer::default();
        let prompt = composer.compose("What is mitosis?", "Cells divide.", "one_word");

        let text = &prompt.text;
        let instruction = text.find("single word").unwrap();
        let framing = text.find(QUESTION_FRAMING).unwrap();
        let context = text.find("Context: Cells divide.").unwrap();
        let question = text.find("Question: What is mitosis?").unwrap();

        assert!(instruction < framing && framing < context && context < question);
        assert_eq!(prompt.max_length, 20);
    }

    #[test]
    fn test_answer_format_parse() {
        assert_eq!("bullet_points".parse::<AnswerFormat>(), Ok(AnswerFormat::BulletPoints));
        assert!("Bullet".parse::<AnswerFormat>().is_err());
        assert_eq!(AnswerFormat::OneWord.to_string(), "one_word");
    }

    #[test]
    fn test_flashcard_prompt_contains_examples_before_context() {
        let composer = PromptComposer::default();
        let prompt = composer.flashcard_prompt("Plants make sugar.");
        let examples = prompt.text.find(FLASHCARD_EXAMPLES).unwrap();
        let context = prompt.text.find("Context: Plants make sugar.").unwrap();
        assert!(examples < context);
        assert!(prompt.text.ends_with("Flashcards:"));
    }
}
