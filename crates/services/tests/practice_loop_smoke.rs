use chrono::Duration;
use services::{AppServices, Clock, PracticeError};
use storage::repository::{
    InMemoryRepository, ReviewRecordRepository, Storage, WordRepository,
};
use vocab_core::model::{
    MasteryLevel, PracticeMode, QuestionType, ReviewRecord, SessionState, Word, WordId,
};
use vocab_core::time::fixed_now;

async fn seed_due_words(repo: &InMemoryRepository, n: u64) {
    let now = fixed_now();
    for id in 1..=n {
        let word = Word::new(WordId::new(id), format!("word{id}"), format!("meaning {id}"))
            .unwrap()
            .with_example(format!("This sentence uses word{id} once."));
        repo.upsert_word(&word).await.unwrap();
        repo.upsert_records(&[ReviewRecord {
            word_id: WordId::new(id),
            level: MasteryLevel::new(2).unwrap(),
            next_review_at: now,
            last_reviewed_at: now - Duration::days(3),
            streak: 1,
        }])
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn review_session_updates_records_and_history() {
    let repo = InMemoryRepository::new();
    seed_due_words(&repo, 5).await;
    let storage = Storage::from_repository(repo.clone());
    let services = AppServices::from_storage(&storage, Clock::fixed(fixed_now()), Some(11));
    let practice = services.practice();

    let mut session = practice
        .start_due_session(PracticeMode::Mixed, 5)
        .await
        .unwrap();
    assert_eq!(session.session().questions().len(), 5);

    let mut missed = None;
    let mut completed = false;
    while !session.is_complete() {
        let question = session.current_question().unwrap().clone();
        let answer = if missed.is_none() {
            missed = Some(question.word().id());
            "definitely wrong"
        } else {
            question.correct_answer()
        };
        assert!(practice.answer(&mut session, question.id(), answer).is_applied());
        completed = practice.advance(&mut session).await.unwrap().is_completed();
    }
    assert!(completed);
    assert_eq!(session.state(), SessionState::Completed);

    let report = session.submission().unwrap();
    assert_eq!(report.points, 8);

    let ids: Vec<WordId> = (1..=5).map(WordId::new).collect();
    let records = repo.get_records(&ids).await.unwrap();
    let missed = missed.unwrap();
    for record in records {
        if record.word_id == missed {
            assert_eq!(record.level, MasteryLevel::MIN);
            assert_eq!(record.streak, 0);
        } else {
            assert_eq!(record.level.value(), 3);
            assert_eq!(record.next_review_at, fixed_now() + Duration::days(7));
        }
    }

    let history = practice.history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].score, 80);
    assert_eq!(history[0].question_types, QuestionType::MIXED_ROTATION.to_vec());
    assert!(history[0].achievements.high_scorer);

    // Only the earliest batch is review-ready: the missed word.
    let next = services.review_queue().next_review().await.unwrap().unwrap();
    assert_eq!(next.at, fixed_now() + Duration::days(1));
    let again = practice
        .start_due_session(PracticeMode::Mixed, 5)
        .await
        .unwrap();
    assert_eq!(again.session().questions().len(), 1);
    assert_eq!(again.session().questions()[0].word().id(), missed);
}

#[tokio::test]
async fn empty_store_has_nothing_to_review() {
    let services =
        AppServices::from_storage(&Storage::in_memory(), Clock::fixed(fixed_now()), None);
    assert!(matches!(
        services
            .practice()
            .start_due_session(PracticeMode::Mixed, 5)
            .await,
        Err(PracticeError::DataUnavailable)
    ));
    assert!(services.review_queue().next_review().await.unwrap().is_none());
}

#[tokio::test]
async fn skipping_everything_submits_nothing() {
    let repo = InMemoryRepository::new();
    seed_due_words(&repo, 2).await;
    let services = AppServices::from_storage(
        &Storage::from_repository(repo.clone()),
        Clock::fixed(fixed_now()),
        Some(3),
    );
    let practice = services.practice();

    let mut session = practice
        .start_due_session(PracticeMode::Single(QuestionType::FillBlank), 2)
        .await
        .unwrap();
    while !session.is_complete() {
        practice.skip(&mut session).await.unwrap();
    }

    assert_eq!(session.submission().unwrap().points, 0);
    let records = repo
        .get_records(&[WordId::new(1), WordId::new(2)])
        .await
        .unwrap();
    assert!(records.iter().all(|r| r.level.value() == 2));

    let history = practice.history().await.unwrap();
    assert_eq!(history[0].score, 0);
    assert_eq!(history[0].answered(), 0);
}
