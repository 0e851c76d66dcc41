//! Flashcard 모듈 - 생성 텍스트에서 질문/답 카드 추출
//!
//! 모델 출력은 형식이 들쭉날쭉하므로 두 가지 규칙을 순서대로 시도합니다.
//! 1. 마커 규칙: `"Flashcard "` 마커로 나눈 블록마다 `Question:`/`Answer:` 줄
//! 2. 질문 규칙: 마커가 없을 때 `Question:` ... `Answer:` 쌍
//!
//! 파싱은 실패하지 않습니다. 규칙에 맞지 않는 조각은 건너뜁니다.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 기본 최대 카드 수
pub const MAX_FLASHCARDS: usize = 5;

const FLASHCARD_MARKER: &str = "Flashcard ";
const QUESTION_TOKEN: &str = "Question:";

// ============================================================================
// Flashcard
// ============================================================================

/// 학습 카드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
    /// 복습 횟수
    #[serde(default)]
    pub review_count: u32,
    /// 마지막 복습 시각
    #[serde(default)]
    pub last_reviewed: Option<DateTime<Utc>>,
}

impl Flashcard {
    /// 복습 이력 없는 새 카드
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            review_count: 0,
            last_reviewed: None,
        }
    }

    /// 앞뒤 공백 제거 후 둘 다 비어있지 않을 때만 생성
    fn from_parts(question: &str, answer: &str) -> Option<Self> {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() || answer.is_empty() {
            return None;
        }
        Some(Self::new(question, answer))
    }
}

// ============================================================================
// Parser
// ============================================================================

/// 줄 앞 공백은 허용하고 대소문자는 무시
fn labeled_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*(question|answer):(.*)$").unwrap())
}

fn answer_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)answer:").unwrap())
}

fn question_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)question:").unwrap())
}

/// 카드 파서
#[derive(Debug, Clone)]
pub struct FlashcardParser {
    max_cards: usize,
}

impl Default for FlashcardParser {
    fn default() -> Self {
        Self::new(MAX_FLASHCARDS)
    }
}

impl FlashcardParser {
    pub fn new(max_cards: usize) -> Self {
        Self { max_cards }
    }

    /// 생성 텍스트 파싱 (최대 `max_cards`장)
    pub fn parse(&self, generated: &str) -> Vec<Flashcard> {
        let text = normalize_newlines(generated);

        let mut cards = match parse_marker_blocks(&text) {
            Some(cards) => cards,
            None => {
                tracing::debug!("No flashcard markers, falling back to Question/Answer pairs");
                parse_question_pairs(&text)
            }
        };

        tracing::debug!("Parsed {} flashcards", cards.len());
        cards.truncate(self.max_cards);
        cards
    }
}

/// 기본 설정으로 파싱
pub fn parse_flashcards(generated: &str) -> Vec<Flashcard> {
    FlashcardParser::default().parse(generated)
}

/// `\r\n`, `\r` -> `\n`
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// 마커 규칙
///
/// 마커가 하나도 없으면 `None` (다음 규칙으로 넘어감).
/// 3줄 미만이거나 질문/답 줄이 없는 블록은 건너뜁니다.
pub fn parse_marker_blocks(text: &str) -> Option<Vec<Flashcard>> {
    let mut segments = text.split(FLASHCARD_MARKER);
    segments.next();

    let blocks: Vec<&str> = segments.collect();
    if blocks.is_empty() {
        return None;
    }

    let cards = blocks
        .into_iter()
        .filter_map(|block| {
            let lines: Vec<&str> = block.split('\n').collect();
            if lines.len() < 3 {
                return None;
            }

            let mut question = None;
            let mut answer = None;
            for line in lines {
                let Some(caps) = labeled_line_re().captures(line) else {
                    continue;
                };
                let value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                match caps[1].to_ascii_lowercase().as_str() {
                    "question" if question.is_none() => question = Some(value),
                    "answer" if answer.is_none() => answer = Some(value),
                    _ => {}
                }
            }

            Flashcard::from_parts(question?, answer?)
        })
        .collect();

    Some(cards)
}

/// 질문 규칙
///
/// `Question:` 뒤, 첫 `answer:` 앞까지가 질문이고
/// 그 뒤부터 다음 `question:` (또는 끝)까지가 답입니다.
pub fn parse_question_pairs(text: &str) -> Vec<Flashcard> {
    text.split(QUESTION_TOKEN)
        .skip(1)
        .filter_map(|segment| {
            let answer_at = answer_token_re().find(segment)?;
            let question = &segment[..answer_at.start()];
            let rest = &segment[answer_at.end()..];

            let answer = match question_token_re().find(rest) {
                Some(next) => &rest[..next.start()],
                None => rest,
            };

            Flashcard::from_parts(question, answer)
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::FLASHCARD_EXAMPLES;

    fn pairs(cards: &[Flashcard]) -> Vec<(&str, &str)> {
        cards
            .iter()
            .map(|c| (c.question.as_str(), c.answer.as_str()))
            .collect()
    }

    #[test]
    fn test_parse_few_shot_block() {
        let cards = parse_flashcards(FLASHCARD_EXAMPLES);

        assert_eq!(
            pairs(&cards),
            vec![
                ("What is the capital of France?", "Paris"),
                ("What is 2+2?", "4"),
                ("What is the color of the sky?", "Blue"),
                ("What is the largest planet?", "Jupiter"),
                ("What is water made of?", "Hydrogen and oxygen"),
            ]
        );
        assert!(cards.iter().all(|c| c.review_count == 0 && c.last_reviewed.is_none()));
    }

    #[test]
    fn test_no_tokens_yields_nothing() {
        assert!(parse_flashcards("Photosynthesis turns light into sugar.").is_empty());
        assert!(parse_flashcards("").is_empty());
    }

    #[test]
    fn test_output_capped_at_five() {
        let text: String = (1..=8)
            .map(|i| format!("Flashcard {}:\nQuestion: Q{}?\nAnswer: A{}\n\n", i, i, i))
            .collect();
        let cards = parse_flashcards(&text);

        assert_eq!(cards.len(), 5);
        assert_eq!(cards[4].question, "Q5?");
    }

    #[test]
    fn test_marker_rule_skips_short_or_incomplete_blocks() {
        let text = "Here you go.\n\
                    Flashcard 1: Question: inline only\n\
                    Flashcard 2:\nQuestion: Missing answer?\nNotes: none\n\
                    Flashcard 3:\nquestion: What is DNA?\nANSWER: Genetic material\n";
        let cards = parse_marker_blocks(&normalize_newlines(text)).unwrap();

        assert_eq!(pairs(&cards), vec![("What is DNA?", "Genetic material")]);
    }

    #[test]
    fn test_marker_rule_not_applicable_without_marker() {
        assert!(parse_marker_blocks("Question: a\nAnswer: b").is_none());
        // 마커가 있으면 카드가 없어도 다음 규칙으로 넘어가지 않음
        let text = "Flashcard 1:\nQuestion: only\n";
        assert_eq!(parse_flashcards(text), vec![]);
    }

    #[test]
    fn test_marker_rule_uses_first_matching_lines() {
        let text = "Flashcard 1:\nQuestion: first\nQuestion: second\nAnswer: one\nAnswer: two";
        let cards = parse_marker_blocks(text).unwrap();
        assert_eq!(pairs(&cards), vec![("first", "one")]);
    }

    #[test]
    fn test_marker_rule_accepts_indented_lines() {
        let text = "Flashcard 1:\n   Question: What is RNA?\n\tAnswer: A nucleic acid\n";
        let cards = parse_marker_blocks(text).unwrap();
        assert_eq!(pairs(&cards), vec![("What is RNA?", "A nucleic acid")]);

        // 줄 중간의 토큰은 인정하지 않음
        let text = "Flashcard 1:\nNote Question: no\nSee Answer: no\n";
        assert_eq!(parse_marker_blocks(text).unwrap(), vec![]);
    }

    #[test]
    fn test_question_rule_pairs() {
        let text = "Question: What is a cell? Answer: The unit of life. \
                    Question: What is an atom?\nanswer: A unit of matter.";
        let cards = parse_question_pairs(text);

        assert_eq!(
            pairs(&cards),
            vec![
                ("What is a cell?", "The unit of life."),
                ("What is an atom?", "A unit of matter."),
            ]
        );
    }

    #[test]
    fn test_question_rule_stops_answer_at_lowercase_question() {
        let cards = parse_question_pairs("Question: X? Answer: Y question: stray");
        assert_eq!(pairs(&cards), vec![("X?", "Y")]);
    }

    #[test]
    fn test_question_rule_discards_empty_parts() {
        let text = "Question: Answer: orphan\nQuestion: Lonely? Answer:   \nQuestion: Ok? Answer: Yes";
        assert_eq!(pairs(&parse_question_pairs(text)), vec![("Ok?", "Yes")]);
    }

    #[test]
    fn test_crlf_normalized() {
        let text = "Flashcard 1:\r\nQuestion: Q?\r\nAnswer: A\r\n";
        assert_eq!(pairs(&parse_flashcards(text)), vec![("Q?", "A")]);
    }

    #[test]
    fn test_flashcard_serde_defaults() {
        let card: Flashcard =
            serde_json::from_str(r#"{"question":"Q","answer":"A"}"#).unwrap();
        assert_eq!(card, Flashcard::new("Q", "A"));
    }
}
