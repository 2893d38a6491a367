use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::word::Word;

/// Placeholder substituted for the target word in fill-blank prompts.
pub const BLANK: &str = "_______";

/// Answer the UI submits once every matching pair has been connected.
pub const MATCHING_COMPLETE: &str = "matched";

/// Answer the UI submits once the drag-drop sentence is assembled correctly.
pub const DRAG_DROP_COMPLETE: &str = "correct";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown practice mode: {0}")]
pub struct ParseModeError(pub String);

//
// ─── QUESTION TYPE ─────────────────────────────────────────────────────────────
//

/// The exercise shapes a question can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    FillBlank,
    Listening,
    ListeningChoice,
    Matching,
    DragDrop,
}

impl QuestionType {
    /// Types cycled through by a mixed session, in round-robin order.
    pub const MIXED_ROTATION: [QuestionType; 5] = [
        QuestionType::MultipleChoice,
        QuestionType::FillBlank,
        QuestionType::Listening,
        QuestionType::Matching,
        QuestionType::DragDrop,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::FillBlank => "fill-blank",
            QuestionType::Listening => "listening",
            QuestionType::ListeningChoice => "listening-choice",
            QuestionType::Matching => "matching",
            QuestionType::DragDrop => "drag-drop",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple-choice" => Ok(QuestionType::MultipleChoice),
            "fill-blank" => Ok(QuestionType::FillBlank),
            "listening" => Ok(QuestionType::Listening),
            "listening-choice" => Ok(QuestionType::ListeningChoice),
            "matching" => Ok(QuestionType::Matching),
            "drag-drop" => Ok(QuestionType::DragDrop),
            other => Err(ParseModeError(other.to_owned())),
        }
    }
}

//
// ─── PRACTICE MODE ─────────────────────────────────────────────────────────────
//

/// Either a mixed session or a session made of a single question type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PracticeMode {
    Mixed,
    Single(QuestionType),
}

impl PracticeMode {
    /// Question type used at position `index` of a session in this mode.
    #[must_use]
    pub fn type_at(self, index: usize) -> QuestionType {
        match self {
            PracticeMode::Mixed => {
                QuestionType::MIXED_ROTATION[index % QuestionType::MIXED_ROTATION.len()]
            }
            PracticeMode::Single(kind) => kind,
        }
    }
}

impl fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PracticeMode::Mixed => f.write_str("mixed"),
            PracticeMode::Single(kind) => f.write_str(kind.as_str()),
        }
    }
}

impl FromStr for PracticeMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "mixed" {
            return Ok(PracticeMode::Mixed);
        }
        s.parse::<QuestionType>().map(PracticeMode::Single)
    }
}

impl TryFrom<String> for PracticeMode {
    type Error = ParseModeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PracticeMode> for String {
    fn from(mode: PracticeMode) -> Self {
        mode.to_string()
    }
}

//
// ─── PAYLOAD ───────────────────────────────────────────────────────────────────
//

/// One side of a matching pair. Fronts carry the spelling, backs the definition;
/// each entry's `match_id` points at its partner's `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingPair {
    pub id: String,
    pub text: String,
    pub match_id: String,
}

impl MatchingPair {
    /// Front entries start with `a-`; back entries with `b-`.
    #[must_use]
    pub fn is_front(&self) -> bool {
        self.id.starts_with("a-")
    }
}

/// Type-specific content of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum QuestionPayload {
    /// Multiple-choice and listening-choice.
    Choices { options: Vec<String> },
    /// Fill-blank: the example sentence with the target blanked, or a synthetic prompt.
    Blank { prompt: String },
    /// Listening: the word's audio is the only prompt.
    Audio,
    Matching { pairs: Vec<MatchingPair> },
    DragDrop {
        sentence: String,
        drag_words: Vec<String>,
    },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A fully specified exercise targeting one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    kind: QuestionType,
    word: Word,
    correct_answer: String,
    payload: QuestionPayload,
}

impl Question {
    #[must_use]
    pub fn new(
        id: QuestionId,
        kind: QuestionType,
        word: Word,
        correct_answer: impl Into<String>,
        payload: QuestionPayload,
    ) -> Self {
        Self {
            id,
            kind,
            word,
            correct_answer: correct_answer.into(),
            payload,
        }
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> QuestionType {
        self.kind
    }

    #[must_use]
    pub fn word(&self) -> &Word {
        &self.word
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn payload(&self) -> &QuestionPayload {
        &self.payload
    }

    #[must_use]
    pub fn options(&self) -> Option<&[String]> {
        match &self.payload {
            QuestionPayload::Choices { options } => Some(options),
            _ => None,
        }
    }

    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        match &self.payload {
            QuestionPayload::Blank { prompt } => Some(prompt),
            _ => None,
        }
    }

    #[must_use]
    pub fn pairs(&self) -> Option<&[MatchingPair]> {
        match &self.payload {
            QuestionPayload::Matching { pairs } => Some(pairs),
            _ => None,
        }
    }

    #[must_use]
    pub fn sentence(&self) -> Option<&str> {
        match &self.payload {
            QuestionPayload::DragDrop { sentence, .. } => Some(sentence),
            _ => None,
        }
    }

    #[must_use]
    pub fn drag_words(&self) -> Option<&[String]> {
        match &self.payload {
            QuestionPayload::DragDrop { drag_words, .. } => Some(drag_words),
            _ => None,
        }
    }

    /// Case-insensitive comparison of a submitted answer against the expected one.
    #[must_use]
    pub fn is_correct(&self, answer: &str) -> bool {
        answer.to_lowercase() == self.correct_answer.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WordId;

    fn word() -> Word {
        Word::new(WordId::new(1), "Ubiquitous", "found everywhere").unwrap()
    }

    #[test]
    fn mixed_mode_rotates_through_five_types() {
        let kinds: Vec<_> = (0..7).map(|i| PracticeMode::Mixed.type_at(i)).collect();
        assert_eq!(
            kinds,
            vec![
                QuestionType::MultipleChoice,
                QuestionType::FillBlank,
                QuestionType::Listening,
                QuestionType::Matching,
                QuestionType::DragDrop,
                QuestionType::MultipleChoice,
                QuestionType::FillBlank,
            ]
        );
    }

    #[test]
    fn single_mode_repeats_its_type() {
        let mode = PracticeMode::Single(QuestionType::ListeningChoice);
        assert!((0..4).all(|i| mode.type_at(i) == QuestionType::ListeningChoice));
    }

    #[test]
    fn mode_parses_from_kebab_case() {
        assert_eq!("mixed".parse::<PracticeMode>().unwrap(), PracticeMode::Mixed);
        assert_eq!(
            "drag-drop".parse::<PracticeMode>().unwrap(),
            PracticeMode::Single(QuestionType::DragDrop)
        );
        assert!("spelling".parse::<PracticeMode>().is_err());
    }

    #[test]
    fn mode_serializes_as_plain_string() {
        let json = serde_json::to_string(&PracticeMode::Single(QuestionType::FillBlank)).unwrap();
        assert_eq!(json, "\"fill-blank\"");
    }

    #[test]
    fn answer_comparison_ignores_case() {
        let q = Question::new(
            QuestionId::new(1),
            QuestionType::Listening,
            word(),
            "Ubiquitous",
            QuestionPayload::Audio,
        );
        assert!(q.is_correct("ubiquitous"));
        assert!(q.is_correct("UBIQUITOUS"));
        assert!(!q.is_correct("ubiquitus"));
    }

    #[test]
    fn payload_accessors_match_variant() {
        let q = Question::new(
            QuestionId::new(2),
            QuestionType::DragDrop,
            word(),
            DRAG_DROP_COMPLETE,
            QuestionPayload::DragDrop {
                sentence: "s".into(),
                drag_words: vec!["a".into()],
            },
        );
        assert_eq!(q.sentence(), Some("s"));
        assert_eq!(q.drag_words().map(<[String]>::len), Some(1));
        assert!(q.options().is_none());
        assert!(q.pairs().is_none());
    }
}
