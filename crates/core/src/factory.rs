//! Turns a target word and a candidate pool into a concrete exercise.
//!
//! Output shape is fixed by the requested `QuestionType`; which distractors are
//! picked and how options are ordered comes from the injected RNG, so a seeded
//! factory always produces the same questions.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

use crate::model::{
    BLANK, DRAG_DROP_COMPLETE, MATCHING_COMPLETE, MatchingPair, Question, QuestionId,
    QuestionPayload, QuestionType, Word,
};

/// Distractor definitions offered next to the correct one.
pub const CHOICE_DISTRACTORS: usize = 3;

/// Extra words shown alongside the target in a matching board.
pub const MATCHING_DISTRACTORS: usize = 5;

/// Sentence tokens offered next to the target token in drag-drop.
pub const DRAG_DISTRACTORS: usize = 2;

const TOKEN_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FactoryError {
    #[error("candidate pool is empty")]
    EmptyPool,
}

/// Builds questions, numbering them `1, 2, 3, ...` until `restart_numbering`.
#[derive(Debug)]
pub struct QuestionFactory<R: Rng> {
    rng: R,
    next_id: u32,
}

impl QuestionFactory<StdRng> {
    /// Factory with a deterministic RNG.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Factory seeded from the operating system.
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R: Rng> QuestionFactory<R> {
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self { rng, next_id: 1 }
    }

    /// Start question ids over at 1 for a new session.
    pub fn restart_numbering(&mut self) {
        self.next_id = 1;
    }

    /// Pick up to `size` distinct words in random order.
    pub fn choose_window(&mut self, words: &[Word], size: usize) -> Vec<Word> {
        let mut window: Vec<Word> = words.choose_multiple(&mut self.rng, size).cloned().collect();
        window.shuffle(&mut self.rng);
        window
    }

    /// Build one question of `kind` targeting `word`, drawing distractors from `pool`.
    ///
    /// Missing example sentences or parts of speech never fail; a synthetic
    /// fallback is used instead.
    ///
    /// # Errors
    ///
    /// Returns `FactoryError::EmptyPool` if `pool` is empty.
    pub fn build(
        &mut self,
        word: &Word,
        kind: QuestionType,
        pool: &[Word],
    ) -> Result<Question, FactoryError> {
        if pool.is_empty() {
            return Err(FactoryError::EmptyPool);
        }

        let (correct_answer, payload) = match kind {
            QuestionType::MultipleChoice | QuestionType::ListeningChoice => (
                word.definition().to_owned(),
                QuestionPayload::Choices {
                    options: self.choice_options(word, pool),
                },
            ),
            QuestionType::FillBlank => (
                word.text().to_owned(),
                QuestionPayload::Blank {
                    prompt: blank_sentence(word),
                },
            ),
            QuestionType::Listening => (word.text().to_owned(), QuestionPayload::Audio),
            QuestionType::Matching => (
                MATCHING_COMPLETE.to_owned(),
                QuestionPayload::Matching {
                    pairs: self.matching_pairs(word, pool),
                },
            ),
            QuestionType::DragDrop => {
                let (sentence, drag_words) = self.drag_drop(word);
                (
                    DRAG_DROP_COMPLETE.to_owned(),
                    QuestionPayload::DragDrop {
                        sentence,
                        drag_words,
                    },
                )
            }
        };

        let id = QuestionId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);

        Ok(Question::new(id, kind, word.clone(), correct_answer, payload))
    }

    /// Correct definition plus up to three distinct distractor definitions, shuffled.
    ///
    /// Definitions are de-duplicated ignoring case so the case-insensitive
    /// answer check can never match two options.
    fn choice_options(&mut self, word: &Word, pool: &[Word]) -> Vec<String> {
        let correct = word.definition();
        let mut seen: HashSet<String> = HashSet::from([correct.to_lowercase()]);
        let candidates: Vec<&str> = pool
            .iter()
            .filter(|w| w.id() != word.id())
            .map(Word::definition)
            .filter(|d| seen.insert(d.to_lowercase()))
            .collect();

        let mut options: Vec<String> = candidates
            .choose_multiple(&mut self.rng, CHOICE_DISTRACTORS)
            .map(|d| (*d).to_owned())
            .collect();
        options.push(correct.to_owned());
        options.shuffle(&mut self.rng);
        options
    }

    fn matching_pairs(&mut self, word: &Word, pool: &[Word]) -> Vec<MatchingPair> {
        let mut seen = HashSet::from([word.id()]);
        let others: Vec<&Word> = pool.iter().filter(|w| seen.insert(w.id())).collect();

        let mut board = vec![word];
        board.extend(
            others
                .choose_multiple(&mut self.rng, MATCHING_DISTRACTORS)
                .copied(),
        );

        board
            .into_iter()
            .flat_map(|w| {
                let front = format!("a-{}", w.id());
                let back = format!("b-{}", w.id());
                [
                    MatchingPair {
                        id: front.clone(),
                        text: w.text().to_owned(),
                        match_id: back.clone(),
                    },
                    MatchingPair {
                        id: back,
                        text: w.definition().to_owned(),
                        match_id: front,
                    },
                ]
            })
            .collect()
    }

    fn drag_drop(&mut self, word: &Word) -> (String, Vec<String>) {
        let Some(example) = word.example() else {
            let pos = word.part_of_speech().unwrap_or("word");
            let sentence = format!(
                "The {} is a {} that means {}.",
                word.text(),
                pos,
                word.definition()
            );
            return (
                sentence,
                vec![
                    word.text().to_owned(),
                    pos.to_owned(),
                    word.definition().to_owned(),
                ],
            );
        };

        let target_lower = word.text().to_lowercase();
        let tokens: Vec<&str> = example
            .split_whitespace()
            .map(|t| t.trim_end_matches(TOKEN_PUNCTUATION))
            .collect();
        let target_index = tokens.iter().position(|t| t.to_lowercase() == target_lower);

        let candidates: Vec<&str> = tokens
            .iter()
            .enumerate()
            .filter(|(i, t)| {
                Some(*i) != target_index
                    && t.chars().count() > 3
                    && t.to_lowercase() != target_lower
            })
            .map(|(_, t)| *t)
            .collect();

        let target = target_index.map_or_else(|| word.text().to_owned(), |i| tokens[i].to_owned());
        let mut drag_words = vec![target];
        drag_words.extend(
            candidates
                .choose_multiple(&mut self.rng, DRAG_DISTRACTORS)
                .map(|t| (*t).to_owned()),
        );

        (example.to_owned(), drag_words)
    }
}

/// `sentence` with its first whole-word, case-insensitive occurrence of
/// `target` blanked out. `None` when `target` does not occur.
#[must_use]
pub fn blank_word(sentence: &str, target: &str) -> Option<String> {
    let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(target))).ok()?;
    let m = re.find(sentence)?;
    Some(format!(
        "{}{}{}",
        &sentence[..m.start()],
        BLANK,
        &sentence[m.end()..]
    ))
}

/// The word's example with its first whole-word, case-insensitive occurrence
/// blanked out, or a synthetic prompt when there is no usable example.
#[must_use]
pub fn blank_sentence(word: &Word) -> String {
    word.example()
        .and_then(|example| blank_word(example, word.text()))
        .unwrap_or_else(|| format!("Please use the word \"{}\" in a sentence.", word.text()))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
