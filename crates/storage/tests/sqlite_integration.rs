use chrono::Duration;
use storage::repository::{
    ReviewRecordRepository, SessionSnapshotRepository, StorageError, WordRepository, WordSource,
};
use storage::sqlite::SqliteRepository;
use vocab_core::model::{
    Achievements, CefrLevel, CourseId, LessonId, MasteryLevel, PracticeMode, QuestionType,
    ReviewRecord, SessionId, SessionSummary, Word, WordId,
};
use vocab_core::time::fixed_now;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn word(id: u64) -> Word {
    Word::new(WordId::new(id), format!("word{id}"), format!("meaning {id}")).unwrap()
}

fn record(id: u64, level: u8, next: chrono::DateTime<chrono::Utc>) -> ReviewRecord {
    ReviewRecord {
        word_id: WordId::new(id),
        level: MasteryLevel::new(level).unwrap(),
        next_review_at: next,
        last_reviewed_at: fixed_now(),
        streak: 2,
    }
}

#[tokio::test]
async fn sqlite_roundtrips_words_with_optional_fields() {
    let repo = connect("memdb_words").await;
    let full = Word::new(WordId::new(1), "ubiquitous", "found everywhere")
        .unwrap()
        .with_example("Phones are ubiquitous.")
        .with_part_of_speech("adjective")
        .with_audio("ubiquitous.mp3")
        .with_cefr(CefrLevel::C1);
    repo.upsert_word(&full).await.unwrap();
    repo.upsert_word(&word(2)).await.unwrap();

    assert_eq!(repo.get_word(WordId::new(1)).await.unwrap(), full);
    assert_eq!(repo.get_word(WordId::new(2)).await.unwrap(), word(2));
    assert!(matches!(
        repo.get_word(WordId::new(3)).await,
        Err(StorageError::NotFound)
    ));

    // migrations are idempotent
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn sqlite_due_words_use_grace_cutoff() {
    let repo = connect("memdb_due").await;
    let now = fixed_now();
    for id in 1..=4 {
        repo.upsert_word(&word(id)).await.unwrap();
    }

    assert!(repo.fetch_due_words(now, 10).await.unwrap().is_empty());

    repo.upsert_records(&[
        record(1, 2, now + Duration::hours(3)),
        record(2, 1, now + Duration::hours(2)),
        record(3, 3, now + Duration::hours(2) + Duration::minutes(45)),
        record(4, 1, now + Duration::days(1)),
    ])
    .await
    .unwrap();

    let due = repo.fetch_due_words(now, 10).await.unwrap();
    let ids: Vec<u64> = due.iter().map(|w| w.id().value()).collect();
    assert_eq!(ids, vec![2, 3, 1]);

    let limited = repo.fetch_due_words(now, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id(), WordId::new(2));

    let next = repo.next_record().await.unwrap().unwrap();
    assert_eq!(next.word_id, WordId::new(2));
}

#[tokio::test]
async fn sqlite_record_upsert_is_all_or_nothing() {
    let repo = connect("memdb_records").await;
    repo.upsert_word(&word(1)).await.unwrap();

    let err = repo
        .upsert_records(&[record(1, 4, fixed_now()), record(99, 1, fixed_now())])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
    assert!(
        repo.get_records(&[WordId::new(1)])
            .await
            .unwrap()
            .is_empty()
    );

    let stored = record(1, 4, fixed_now() + Duration::days(14));
    repo.upsert_records(std::slice::from_ref(&stored))
        .await
        .unwrap();
    assert_eq!(
        repo.get_records(&[WordId::new(1), WordId::new(2)])
            .await
            .unwrap(),
        vec![stored]
    );
}

#[tokio::test]
async fn sqlite_lessons_preserve_position() {
    let repo = connect("memdb_lessons").await;
    for id in [10, 11, 12] {
        repo.upsert_word(&word(id)).await.unwrap();
    }
    let (course, lesson) = (CourseId::new(2), LessonId::new(1));

    repo.assign_to_lesson(course, lesson, &[WordId::new(12), WordId::new(10)])
        .await
        .unwrap();
    repo.assign_to_lesson(course, lesson, &[WordId::new(10), WordId::new(11)])
        .await
        .unwrap();

    let ids: Vec<u64> = repo
        .fetch_words_for_course_lesson(course, lesson)
        .await
        .unwrap()
        .iter()
        .map(|w| w.id().value())
        .collect();
    assert_eq!(ids, vec![12, 10, 11]);

    assert!(
        repo.fetch_words_for_course_lesson(course, LessonId::new(9))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn sqlite_history_and_active_snapshot() {
    let repo = connect("memdb_history").await;
    let now = fixed_now();

    assert_eq!(repo.load_active().await.unwrap(), None);
    repo.save_active("{\"a\":1}", now).await.unwrap();
    repo.save_active("{\"a\":2}", now).await.unwrap();
    assert_eq!(
        repo.load_active().await.unwrap().as_deref(),
        Some("{\"a\":2}")
    );
    repo.clear_active().await.unwrap();
    assert_eq!(repo.load_active().await.unwrap(), None);

    let summaries: Vec<SessionSummary> = (0..4)
        .map(|i| SessionSummary {
            session_id: SessionId::generate(),
            mode: PracticeMode::Single(QuestionType::ListeningChoice),
            started_at: now + Duration::minutes(i * 10),
            completed_at: now + Duration::minutes(i * 10 + 3),
            score: 80,
            total_questions: 5,
            correct_answers: 4,
            incorrect_answers: 1,
            time_spent_secs: 180,
            question_types: vec![QuestionType::ListeningChoice],
            achievements: Achievements {
                high_scorer: true,
                speed_demon: false,
                perfect_streak: false,
            },
        })
        .collect();
    for summary in &summaries {
        repo.append_summary(summary).await.unwrap();
    }
    repo.append_summary(&summaries[0]).await.unwrap();

    let recent = repo.recent_summaries(10).await.unwrap();
    assert_eq!(recent.len(), 4);
    assert_eq!(recent[0], summaries[3]);

    assert_eq!(repo.prune_summaries(3).await.unwrap(), 1);
    let recent = repo.recent_summaries(10).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert!(!recent.contains(&summaries[0]));
}
