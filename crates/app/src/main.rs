mod terminal;

use std::fmt;

use services::{
    AppServices, Clock, DEFAULT_SESSION_SIZE, PracticeError, PracticeLoopService,
    PracticeSession,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vocab_core::model::{CourseId, LessonId, PracticeMode};

use terminal::{Board, Input};

const DEFAULT_DB_URL: &str = "sqlite://vocab.sqlite3?mode=rwc";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidMode { raw: String },
    IncompleteLesson,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidMode { raw } => write!(f, "invalid --mode value: {raw}"),
            ArgsError::IncompleteLesson => write!(f, "--course and --lesson must be used together"),
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

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Practice,
    Due,
    Resume,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "practice" => Some(Self::Practice),
            "due" => Some(Self::Due),
            "resume" => Some(Self::Resume),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Args {
    command: Command,
    db_url: String,
    size: usize,
    mode: PracticeMode,
    lesson: Option<(CourseId, LessonId)>,
    seed: Option<u64>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [practice] [options]   # review due words or a lesson");
    eprintln!("  cargo run -p app -- due [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- resume [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>     SQLite URL (default: {DEFAULT_DB_URL})");
    eprintln!("  --size <n>            Questions per session (default: {DEFAULT_SESSION_SIZE})");
    eprintln!("  --mode <mode>         mixed | multiple-choice | fill-blank | listening |");
    eprintln!("                        listening-choice | matching | drag-drop (default: mixed)");
    eprintln!("  --course <id>         Practice a lesson instead of due words (with --lesson)");
    eprintln!("  --lesson <id>");
    eprintln!("  --seed <u64>          Fixed RNG seed for question generation");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("While practicing: empty line or :skip skips, :quit saves and exits,");
    eprintln!(":abandon drops the session.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VOCAB_DB_URL, VOCAB_SESSION_SIZE, VOCAB_MODE, VOCAB_LOG");
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter().peekable();

        let command = match args.peek().map(String::as_str) {
            Some(first) if !first.starts_with('-') => {
                let cmd = Command::from_arg(first)
                    .ok_or_else(|| ArgsError::UnknownCommand(first.to_owned()))?;
                args.next();
                cmd
            }
            _ => Command::Practice,
        };

        let mut db_url = std::env::var("VOCAB_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into());
        let mut size = std::env::var("VOCAB_SESSION_SIZE")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(DEFAULT_SESSION_SIZE);
        let mut mode = std::env::var("VOCAB_MODE")
            .ok()
            .and_then(|value| value.parse::<PracticeMode>().ok())
            .unwrap_or(PracticeMode::Mixed);
        let mut course = None;
        let mut lesson = None;
        let mut seed = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--size" => {
                    size = parse_number("--size", require_value(&mut args, "--size")?)?;
                }
                "--mode" => {
                    let value = require_value(&mut args, "--mode")?;
                    mode = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidMode { raw: value.clone() })?;
                }
                "--course" => {
                    let value = require_value(&mut args, "--course")?;
                    course = Some(CourseId::new(parse_number("--course", value)?));
                }
                "--lesson" => {
                    let value = require_value(&mut args, "--lesson")?;
                    lesson = Some(LessonId::new(parse_number("--lesson", value)?));
                }
                "--seed" => {
                    seed = Some(parse_number("--seed", require_value(&mut args, "--seed")?)?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let lesson = match (course, lesson) {
            (Some(c), Some(l)) => Some((c, l)),
            (None, None) => None,
            _ => return Err(ArgsError::IncompleteLesson),
        };

        Ok(Self {
            command,
            db_url,
            size,
            mode,
            lesson,
            seed,
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("VOCAB_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Create the parent directory of a file-backed database.
fn prepare_sqlite_dir(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

type StdinLines = Lines<BufReader<Stdin>>;

async fn prompt(lines: &mut StdinLines, text: &str) -> std::io::Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    lines.next_line().await
}

/// Retry finishing a completed session until it succeeds or the learner gives up.
async fn finish(
    practice: &PracticeLoopService,
    session: &mut PracticeSession,
    lines: &mut StdinLines,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        match practice.finalize(session).await {
            Ok(report) => {
                let summary = session.summary()?;
                print!("{}", terminal::render_summary(&summary, report.points));
                return Ok(());
            }
            Err(err @ PracticeError::SubmissionFailed(_)) => {
                warn!(error = %err, "could not submit results");
                let answer = prompt(lines, "Submitting results failed. Retry? [Y/n] ").await?;
                if matches!(answer.as_deref().map(str::trim), Some("n" | "N") | None) {
                    println!("Results were kept locally but not submitted.");
                    return Ok(());
                }
            }
            Err(err) => return Err(err.into()),
        }
    }
}

async fn run_session(
    practice: &PracticeLoopService,
    mut session: PracticeSession,
    lines: &mut StdinLines,
    rng: &mut StdRng,
) -> Result<(), Box<dyn std::error::Error>> {
    while let Some(question) = session.current_question().cloned() {
        if session.is_complete() {
            break;
        }
        println!();
        println!("{}", terminal::progress_line(&session.progress()));
        let board = Board::layout(&question, rng);
        print!("{}", board.render());

        let Some(line) = prompt(lines, "> ").await? else {
            practice.save_progress(&session).await?;
            println!();
            println!("Progress saved. Continue later with `resume`.");
            return Ok(());
        };

        match Input::parse(&line) {
            Input::Quit => {
                practice.save_progress(&session).await?;
                println!("Progress saved. Continue later with `resume`.");
                return Ok(());
            }
            Input::Abandon => {
                practice.abandon(&mut session).await?;
                println!("Session abandoned.");
                return Ok(());
            }
            Input::Skip => {
                if let Err(err) = practice.skip(&mut session).await {
                    if !matches!(err, PracticeError::SubmissionFailed(_)) {
                        return Err(err.into());
                    }
                }
            }
            Input::Answer(raw) => {
                let answer = board.resolve(&raw);
                let applied = practice
                    .answer(&mut session, question.id(), &answer)
                    .is_applied();
                if applied && session.last_result().is_some_and(|r| r.is_correct) {
                    println!("Correct!");
                } else {
                    println!("Not quite. Answer: {}", terminal::expected_answer(&question));
                }
                if let Err(err) = practice.advance(&mut session).await {
                    if !matches!(err, PracticeError::SubmissionFailed(_)) {
                        return Err(err.into());
                    }
                }
            }
        }
        practice.save_progress(&session).await?;
    }

    if session.is_complete() {
        println!();
        finish(practice, &mut session, lines).await?;
    }
    Ok(())
}

async fn print_due(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let queue = services.review_queue();
    let due = queue.due_words(u32::MAX).await?;
    println!("{} word(s) ready for review", due.len());
    match queue.next_review().await? {
        Some(next) => println!("{}", terminal::render_countdown(next.countdown)),
        None => println!("no words enrolled for review yet"),
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1).collect()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    init_tracing();

    prepare_sqlite_dir(&args.db_url)?;
    let services = AppServices::new_sqlite(&args.db_url, Clock::default(), args.seed).await?;
    info!(db = %args.db_url, command = ?args.command, "storage ready");

    let practice = services.practice();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut rng = args
        .seed
        .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

    match args.command {
        Command::Due => print_due(&services).await,
        Command::Resume => match practice.resume().await? {
            Some(session) => run_session(&practice, session, &mut lines, &mut rng).await,
            None => {
                println!("No saved session to resume.");
                Ok(())
            }
        },
        Command::Practice => {
            if practice.resume().await?.is_some() {
                println!("A saved session exists; starting a new one replaces it. Use `resume` to continue it.");
            }
            let started = match args.lesson {
                Some((course, lesson)) => {
                    practice
                        .start_lesson_session(course, lesson, args.mode, args.size)
                        .await
                }
                None => practice.start_due_session(args.mode, args.size).await,
            };
            match started {
                Ok(session) => run_session(&practice, session, &mut lines, &mut rng).await,
                Err(PracticeError::DataUnavailable) => {
                    println!("Nothing to practice right now.");
                    if args.lesson.is_none() {
                        if let Some(next) = services.review_queue().next_review().await? {
                            println!("{}", terminal::render_countdown(next.countdown));
                        }
                    }
                    Ok(())
                }
                Err(err) => Err(err.into()),
            }
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocab_core::model::QuestionType;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn defaults_to_practice() {
        let args = Args::parse(argv(&["--size", "5", "--mode", "fill-blank"])).unwrap();
        assert_eq!(args.command, Command::Practice);
        assert_eq!(args.size, 5);
        assert_eq!(args.mode, PracticeMode::Single(QuestionType::FillBlank));
        assert!(args.lesson.is_none());
    }

    #[test]
    fn subcommands_and_lessons() {
        let args = Args::parse(argv(&["practice", "--course", "2", "--lesson", "3"])).unwrap();
        assert_eq!(args.lesson, Some((CourseId::new(2), LessonId::new(3))));

        assert_eq!(Args::parse(argv(&["due"])).unwrap().command, Command::Due);
        assert_eq!(
            Args::parse(argv(&["resume", "--seed", "9"])).unwrap().seed,
            Some(9)
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            Args::parse(argv(&["--course", "1"])),
            Err(ArgsError::IncompleteLesson)
        ));
        assert!(matches!(
            Args::parse(argv(&["--size", "lots"])),
            Err(ArgsError::InvalidNumber { flag: "--size", .. })
        ));
        assert!(matches!(
            Args::parse(argv(&["--mode", "essay"])),
            Err(ArgsError::InvalidMode { .. })
        ));
        assert!(matches!(
            Args::parse(argv(&["stats"])),
            Err(ArgsError::UnknownCommand(_))
        ));
        assert!(matches!(
            Args::parse(argv(&["--db"])),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
    }
}
