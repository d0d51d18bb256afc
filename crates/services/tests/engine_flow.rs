use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use practice_core::model::{
    Answer, ChoiceOption, FillBlankQuestion, MatchPair, MatchingQuestion, MultipleChoiceQuestion,
    PracticeSetId, QuestionId, QuestionSet, WordlistId,
};
use practice_core::time::fixed_clock;
use services::{
    AnalyticsSink, EngineDeps, EngineOptions, MistakeApi, MistakeReport, MistakeRecorder,
    PracticeAnalytics, RemoteError, SessionContext, SessionEngine, SessionSaveApi,
    SessionSavePayload, SessionTimer,
};
use storage::{InMemoryStore, MistakeQueue, SessionStore};

#[derive(Default)]
struct RecordingCollector {
    sessions: Mutex<Vec<SessionSavePayload>>,
    mistakes: Mutex<Vec<MistakeReport>>,
    events: Mutex<Vec<PracticeAnalytics>>,
}

#[async_trait]
impl SessionSaveApi for RecordingCollector {
    async fn save_session(&self, payload: &SessionSavePayload) -> Result<(), RemoteError> {
        self.sessions.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

#[async_trait]
impl MistakeApi for RecordingCollector {
    async fn record_mistake(&self, report: &MistakeReport) -> Result<(), RemoteError> {
        self.mistakes.lock().unwrap().push(report.clone());
        Ok(())
    }
}

#[async_trait]
impl AnalyticsSink for RecordingCollector {
    async fn record(&self, event: &PracticeAnalytics) -> Result<(), RemoteError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

fn question_set() -> QuestionSet {
    QuestionSet {
        matching: vec![MatchingQuestion {
            id: QuestionId::new("m1"),
            pairs: vec![
                MatchPair {
                    source: "Hund".to_string(),
                    target: "dog".to_string(),
                },
                MatchPair {
                    source: "Katze".to_string(),
                    target: "cat".to_string(),
                },
            ],
            shuffled_targets: vec!["cat".to_string(), "dog".to_string()],
        }],
        fill_blank: vec![FillBlankQuestion {
            id: QuestionId::new("f1"),
            sentence: "Der Hund ist ___.".to_string(),
            answer: "klein".to_string(),
            acceptable: Vec::new(),
        }],
        multiple_choice: vec![MultipleChoiceQuestion {
            id: QuestionId::new("c1"),
            sentence: "Die Katze schläft.".to_string(),
            term: "Katze".to_string(),
            options: vec![
                ChoiceOption {
                    text: "cat".to_string(),
                    is_correct: true,
                },
                ChoiceOption {
                    text: "dog".to_string(),
                    is_correct: false,
                },
            ],
        }],
    }
}

fn context() -> SessionContext {
    SessionContext {
        practice_set_id: PracticeSetId::new("set-1"),
        wordlist_id: WordlistId::new("wl-1"),
        wordlist_name: "Unit 7".to_string(),
        device_class: "desktop".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn full_session_reports_everything_downstream() {
    let kv = InMemoryStore::new();
    let collector = Arc::new(RecordingCollector::default());
    let store = SessionStore::new(Arc::new(kv.clone())).with_clock(fixed_clock());
    let recorder = MistakeRecorder::spawn(
        collector.clone(),
        MistakeQueue::new(Arc::new(kv.clone())),
        Arc::new(|| Some("token-1".to_string())),
    );

    let deps = EngineDeps::new(store.clone())
        .with_saver(collector.clone())
        .with_analytics(collector.clone())
        .with_mistake_recorder(recorder)
        .with_clock(fixed_clock());

    let mut engine = SessionEngine::new(context(), question_set(), deps, EngineOptions::new());

    // Matching fully correct, fill-blank correct, multiple-choice wrong.
    engine.submit_answer(
        QuestionId::new("m1"),
        Answer::Matching {
            pairs: vec![
                MatchPair {
                    source: "Hund".to_string(),
                    target: "dog".to_string(),
                },
                MatchPair {
                    source: "Katze".to_string(),
                    target: "cat".to_string(),
                },
            ],
        },
    );
    engine.next_question();
    engine.submit_answer(
        QuestionId::new("f1"),
        Answer::FillBlank {
            text: "klein".to_string(),
        },
    );
    engine.next_question();
    engine.submit_answer(
        QuestionId::new("c1"),
        Answer::MultipleChoice {
            selected: "dog".to_string(),
        },
    );

    engine.complete_session();
    // Let the fire-and-forget save, analytics, and mistake batch drain.
    tokio::time::sleep(Duration::from_secs(2)).await;

    let results = engine.results().unwrap();
    assert_eq!(results.correct_answers, 2);
    assert!((results.score - 66.67).abs() < 1e-9);

    // Local history is written and the snapshot is gone.
    let history = store.query_history(None);
    assert_eq!(history.len(), 1);
    assert!(store.restore_snapshot().is_none());

    // Remote save got the full answer map.
    let sessions = collector.sessions.lock().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].answers.len(), 3);
    assert_eq!(sessions[0].practice_set_id, PracticeSetId::new("set-1"));

    // Exactly the missed word was reported.
    let mistakes = collector.mistakes.lock().unwrap();
    assert_eq!(mistakes.len(), 1);
    assert_eq!(mistakes[0].word, "Katze");
    assert_eq!(mistakes[0].translation, "cat");
    assert_eq!(mistakes[0].session_token, "token-1");

    // One analytics event with the session shape.
    let events = collector.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].total_questions, 3);
    assert_eq!(events[0].device_class, "desktop");
}

#[tokio::test(start_paused = true)]
async fn shared_timer_drives_the_session_to_expiry() {
    let kv = InMemoryStore::new();
    let store = SessionStore::new(Arc::new(kv.clone())).with_clock(fixed_clock());
    let deps = EngineDeps::new(store).with_clock(fixed_clock());

    let engine = Arc::new(Mutex::new(SessionEngine::new(
        context(),
        question_set(),
        deps,
        EngineOptions::new().timer_minutes(1),
    )));

    let timer = SessionTimer::spawn(engine.clone());
    tokio::time::sleep(Duration::from_secs(65)).await;

    let engine = engine.lock().unwrap();
    assert!(engine.is_completed());
    assert_eq!(engine.time_remaining(), 0);
    drop(timer);
}

#[tokio::test(start_paused = true)]
async fn a_stopped_timer_leaves_the_session_alone() {
    let kv = InMemoryStore::new();
    let store = SessionStore::new(Arc::new(kv.clone())).with_clock(fixed_clock());
    let deps = EngineDeps::new(store).with_clock(fixed_clock());

    let engine = Arc::new(Mutex::new(SessionEngine::new(
        context(),
        question_set(),
        deps,
        EngineOptions::new().timer_minutes(1),
    )));

    let timer = SessionTimer::spawn(engine.clone());
    tokio::time::sleep(Duration::from_secs(10)).await;
    timer.stop();
    tokio::time::sleep(Duration::from_secs(120)).await;

    let engine = engine.lock().unwrap();
    assert!(!engine.is_completed());
    assert!(engine.time_remaining() >= 49);
}
