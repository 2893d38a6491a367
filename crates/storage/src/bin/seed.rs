use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use storage::repository::Storage;
use vocab_core::model::{CefrLevel, CourseId, LessonId, MasteryLevel, ReviewRecord, Word, WordId};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    words_path: String,
    enroll: bool,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingWords,
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingWords => write!(f, "--words <file.json> is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("VOCAB_DB_URL").unwrap_or_else(|_| "sqlite://vocab.sqlite3?mode=rwc".into());
        let mut words_path = std::env::var("VOCAB_WORDS").ok();
        let mut enroll = false;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--words" => {
                    words_path = Some(require_value(&mut args, "--words")?);
                }
                "--enroll" => enroll = true,
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            words_path: words_path.ok_or(ArgsError::MissingWords)?,
            enroll,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- --words <file.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://vocab.sqlite3?mode=rwc)");
    eprintln!("  --words <path>            JSON array of words to import");
    eprintln!("  --enroll                  Put every imported word up for review right away");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Entry shape:");
    eprintln!(
        r#"  {{"id": 1, "text": "..", "definition": "..", "example"?, "pos"?, "audio"?, "cefr"?, "course"?, "lesson"?}}"#
    );
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  VOCAB_DB_URL, VOCAB_WORDS");
}

#[derive(Debug, Deserialize)]
struct WordEntry {
    id: u64,
    text: String,
    definition: String,
    #[serde(default)]
    example: Option<String>,
    #[serde(default, alias = "partOfSpeech")]
    pos: Option<String>,
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    cefr: Option<String>,
    #[serde(default)]
    course: Option<u64>,
    #[serde(default)]
    lesson: Option<u64>,
}

impl WordEntry {
    fn into_word(self) -> Result<Word, Box<dyn std::error::Error>> {
        let mut word = Word::new(WordId::new(self.id), self.text, self.definition)?;
        if let Some(example) = self.example {
            word = word.with_example(example);
        }
        if let Some(pos) = self.pos {
            word = word.with_part_of_speech(pos);
        }
        if let Some(audio) = self.audio {
            word = word.with_audio(audio);
        }
        if let Some(cefr) = self.cefr {
            word = word.with_cefr(cefr.parse::<CefrLevel>()?);
        }
        Ok(word)
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let raw = tokio::fs::read_to_string(&args.words_path).await?;
    let entries: Vec<WordEntry> = serde_json::from_str(&raw)?;

    let mut lessons: BTreeMap<(u64, u64), Vec<WordId>> = BTreeMap::new();
    let mut imported = Vec::with_capacity(entries.len());
    for entry in entries {
        let placement = entry.course.zip(entry.lesson);
        let word = entry.into_word()?;
        storage.words.upsert_word(&word).await?;
        if let Some(key) = placement {
            lessons.entry(key).or_default().push(word.id());
        }
        imported.push(word.id());
    }

    for ((course, lesson), ids) in &lessons {
        storage
            .words
            .assign_to_lesson(CourseId::new(*course), LessonId::new(*lesson), ids)
            .await?;
    }

    if args.enroll {
        let records: Vec<ReviewRecord> = imported
            .iter()
            .map(|id| ReviewRecord {
                word_id: *id,
                level: MasteryLevel::MIN,
                next_review_at: now,
                last_reviewed_at: now,
                streak: 0,
            })
            .collect();
        storage.reviews.upsert_records(&records).await?;
    }

    println!(
        "Imported {} words in {} lessons into {}{}",
        imported.len(),
        lessons.len(),
        args.db_url,
        if args.enroll { " (enrolled for review)" } else { "" }
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
