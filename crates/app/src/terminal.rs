//! Plain-text rendering of questions and mapping typed input to answers.

use std::collections::HashSet;
use std::fmt::Write as _;

use rand::Rng;
use rand::seq::SliceRandom;
use vocab_core::factory::blank_word;
use vocab_core::model::{
    DRAG_DROP_COMPLETE, MATCHING_COMPLETE, MatchingPair, Question, QuestionPayload, QuestionType,
    SessionSummary,
};
use vocab_core::{Progress, ReviewCountdown};

/// What the learner asked for at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Answer(String),
    Skip,
    Quit,
    Abandon,
}

impl Input {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" | ":skip" | ":s" => Input::Skip,
            ":quit" | ":q" => Input::Quit,
            ":abandon" => Input::Abandon,
            other => Input::Answer(other.to_owned()),
        }
    }
}

fn letter(i: usize) -> char {
    u8::try_from(i)
        .ok()
        .and_then(|i| b'a'.checked_add(i))
        .map_or('?', char::from)
}

#[must_use]
pub fn progress_line(p: &Progress) -> String {
    format!(
        "[{}/{}] hearts {} | streak {} (best {})",
        (p.answered + p.skipped + 1).min(p.total),
        p.total,
        p.hearts,
        p.streak,
        p.best_streak
    )
}

/// One question laid out for the terminal.
///
/// Matching columns are shuffled independently, so board order never gives
/// the pairing away. Rendering and answer resolution share the same layout.
#[derive(Debug)]
pub struct Board<'q> {
    question: &'q Question,
    fronts: Vec<&'q MatchingPair>,
    backs: Vec<&'q MatchingPair>,
}

impl<'q> Board<'q> {
    pub fn layout<R: Rng + ?Sized>(question: &'q Question, rng: &mut R) -> Self {
        let (mut fronts, mut backs): (Vec<_>, Vec<_>) = question
            .pairs()
            .unwrap_or_default()
            .iter()
            .partition(|p| p.is_front());
        fronts.shuffle(rng);
        backs.shuffle(rng);
        Self {
            question,
            fronts,
            backs,
        }
    }

    /// Prompt text for the question.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let question = self.question;
        let word = question.word();
        match (question.kind(), question.payload()) {
            (QuestionType::MultipleChoice, QuestionPayload::Choices { options }) => {
                let _ = writeln!(out, "What does \"{}\" mean?", word.text());
                write_options(&mut out, options);
            }
            (QuestionType::ListeningChoice, QuestionPayload::Choices { options }) => {
                let _ = writeln!(out, "Listen: {}", audio_hint(question));
                let _ = writeln!(out, "Which meaning matches what you heard?");
                write_options(&mut out, options);
            }
            (_, QuestionPayload::Choices { options }) => write_options(&mut out, options),
            (_, QuestionPayload::Blank { prompt }) => {
                let _ = writeln!(out, "Fill in the blank:");
                let _ = writeln!(out, "  {prompt}");
            }
            (_, QuestionPayload::Audio) => {
                let _ = writeln!(out, "Listen: {}", audio_hint(question));
                let _ = writeln!(out, "Type the word you heard.");
            }
            (_, QuestionPayload::Matching { .. }) => {
                let _ = writeln!(out, "Match each word to its meaning (e.g. \"1b 2a\"):");
                for (i, front) in self.fronts.iter().enumerate() {
                    let _ = writeln!(out, "  {}. {}", i + 1, front.text);
                }
                for (i, back) in self.backs.iter().enumerate() {
                    let _ = writeln!(out, "  {}) {}", letter(i), back.text);
                }
            }
            (_, QuestionPayload::DragDrop { sentence, drag_words }) => {
                let shown = drag_words
                    .first()
                    .and_then(|target| blank_word(sentence, target))
                    .unwrap_or_else(|| sentence.clone());
                let _ = writeln!(out, "Complete the sentence:");
                let _ = writeln!(out, "  {shown}");
                let mut bank: Vec<&str> = drag_words.iter().map(String::as_str).collect();
                bank.sort_unstable_by_key(|w| w.to_lowercase());
                let _ = writeln!(out, "  words: {}", bank.join(" | "));
            }
        }
        out
    }

    /// Turn typed input into the answer string the engine compares.
    ///
    /// Numbered options may be picked by number. A matching board becomes the
    /// completion token only when every front is paired with its own back
    /// exactly once. A drag-drop target becomes the drag-drop token.
    #[must_use]
    pub fn resolve(&self, input: &str) -> String {
        let input = input.trim();
        match self.question.payload() {
            QuestionPayload::Choices { options } => input
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| options.get(i))
                .cloned()
                .unwrap_or_else(|| input.to_owned()),
            QuestionPayload::Matching { .. } => {
                if self.is_complete_matching(input) {
                    MATCHING_COMPLETE.to_owned()
                } else {
                    input.to_owned()
                }
            }
            QuestionPayload::DragDrop { drag_words, .. } => match drag_words.first() {
                Some(target) if target.to_lowercase() == input.to_lowercase() => {
                    DRAG_DROP_COMPLETE.to_owned()
                }
                _ => input.to_owned(),
            },
            QuestionPayload::Blank { .. } | QuestionPayload::Audio => input.to_owned(),
        }
    }

    fn is_complete_matching(&self, input: &str) -> bool {
        let mut matched = HashSet::new();
        for token in input.split_whitespace() {
            let Some((split, tag)) = token.char_indices().last() else {
                return false;
            };
            let front = token[..split]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| self.fronts.get(i));
            let back = (0..self.backs.len())
                .find(|i| letter(*i) == tag.to_ascii_lowercase())
                .and_then(|i| self.backs.get(i));
            match (front, back) {
                (Some(f), Some(b)) if f.match_id == b.id && matched.insert(&f.id) => {}
                _ => return false,
            }
        }
        !self.fronts.is_empty() && matched.len() == self.fronts.len()
    }
}

fn write_options(out: &mut String, options: &[String]) {
    for (i, option) in options.iter().enumerate() {
        let _ = writeln!(out, "  {}. {option}", i + 1);
    }
}

fn audio_hint(question: &Question) -> String {
    let word = question.word();
    word.audio().map_or_else(
        || format!("(no audio) {}", word.definition()),
        |audio| format!("[{audio}]"),
    )
}

/// The answer to show after a miss.
#[must_use]
pub fn expected_answer(question: &Question) -> String {
    match question.payload() {
        QuestionPayload::Matching { pairs } => pairs
            .iter()
            .filter(|p| p.is_front())
            .filter_map(|f| {
                pairs
                    .iter()
                    .find(|b| b.id == f.match_id)
                    .map(|b| format!("{} = {}", f.text, b.text))
            })
            .collect::<Vec<_>>()
            .join("; "),
        QuestionPayload::DragDrop { drag_words, .. } => drag_words
            .first()
            .cloned()
            .unwrap_or_else(|| question.word().text().to_owned()),
        _ => question.correct_answer().to_owned(),
    }
}

#[must_use]
pub fn render_summary(summary: &SessionSummary, points: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Session complete: {}%", summary.score);
    let _ = writeln!(
        out,
        "  {} correct, {} wrong, {} skipped of {}",
        summary.correct_answers,
        summary.incorrect_answers,
        summary.total_questions.saturating_sub(summary.answered()),
        summary.total_questions
    );
    let _ = writeln!(out, "  time: {}s, points: {points}", summary.time_spent_secs);
    let a = &summary.achievements;
    let earned: Vec<&str> = [
        (a.high_scorer, "high scorer"),
        (a.speed_demon, "speed demon"),
        (a.perfect_streak, "perfect streak"),
    ]
    .iter()
    .filter(|(earned, _)| *earned)
    .map(|(_, name)| *name)
    .collect();
    if !earned.is_empty() {
        let _ = writeln!(out, "  achievements: {}", earned.join(", "));
    }
    out
}

#[must_use]
pub fn render_countdown(countdown: ReviewCountdown) -> String {
    if countdown.is_due() {
        "reviews are ready now".to_owned()
    } else {
        format!(
            "next review in {}h {:02}m {:02}s",
            countdown.hours, countdown.minutes, countdown.seconds
        )
    }
}
