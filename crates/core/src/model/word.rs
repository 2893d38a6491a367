use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::WordId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WordError {
    #[error("word text cannot be empty")]
    EmptyText,
    #[error("word definition cannot be empty")]
    EmptyDefinition,
    #[error("unknown CEFR level: {0}")]
    InvalidCefr(String),
}

//
// ─── CEFR LEVEL ────────────────────────────────────────────────────────────────
//

/// Common European Framework difficulty band, `A1` lowest to `C2` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CefrLevel {
    type Err = WordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A1" => Ok(CefrLevel::A1),
            "A2" => Ok(CefrLevel::A2),
            "B1" => Ok(CefrLevel::B1),
            "B2" => Ok(CefrLevel::B2),
            "C1" => Ok(CefrLevel::C1),
            "C2" => Ok(CefrLevel::C2),
            _ => Err(WordError::InvalidCefr(s.to_owned())),
        }
    }
}

//
// ─── WORD ──────────────────────────────────────────────────────────────────────
//

/// A vocabulary entry as fetched from the word store.
///
/// Words are immutable once constructed; optional fields are attached with the
/// `with_*` builders before the word is handed to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    id: WordId,
    text: String,
    definition: String,
    example: Option<String>,
    part_of_speech: Option<String>,
    audio: Option<String>,
    cefr: Option<CefrLevel>,
}

impl Word {
    /// Creates a word with its required fields.
    ///
    /// # Errors
    ///
    /// Returns `WordError::EmptyText` or `WordError::EmptyDefinition` when either
    /// required field is blank.
    pub fn new(
        id: WordId,
        text: impl Into<String>,
        definition: impl Into<String>,
    ) -> Result<Self, WordError> {
        let text = text.into().trim().to_owned();
        let definition = definition.into().trim().to_owned();
        if text.is_empty() {
            return Err(WordError::EmptyText);
        }
        if definition.is_empty() {
            return Err(WordError::EmptyDefinition);
        }

        Ok(Self {
            id,
            text,
            definition,
            example: None,
            part_of_speech: None,
            audio: None,
            cefr: None,
        })
    }

    /// Attach an example sentence. Blank sentences are treated as absent.
    #[must_use]
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = non_blank(example.into());
        self
    }

    #[must_use]
    pub fn with_part_of_speech(mut self, pos: impl Into<String>) -> Self {
        self.part_of_speech = non_blank(pos.into());
        self
    }

    #[must_use]
    pub fn with_audio(mut self, audio: impl Into<String>) -> Self {
        self.audio = non_blank(audio.into());
        self
    }

    #[must_use]
    pub fn with_cefr(mut self, cefr: CefrLevel) -> Self {
        self.cefr = Some(cefr);
        self
    }

    #[must_use]
    pub fn id(&self) -> WordId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }

    #[must_use]
    pub fn example(&self) -> Option<&str> {
        self.example.as_deref()
    }

    #[must_use]
    pub fn part_of_speech(&self) -> Option<&str> {
        self.part_of_speech.as_deref()
    }

    #[must_use]
    pub fn audio(&self) -> Option<&str> {
        self.audio.as_deref()
    }

    #[must_use]
    pub fn cefr(&self) -> Option<CefrLevel> {
        self.cefr
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
