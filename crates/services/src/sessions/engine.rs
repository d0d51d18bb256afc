use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use practice_core::model::{
    Answer, HistoryItem, Mistake, PracticeSetId, QuestionCategory, QuestionId, QuestionRef,
    QuestionSet, SessionId, SessionResults, SessionSnapshot, SessionState, WordlistId,
};
use practice_core::results::calculate_results;
use practice_core::scoring;
use practice_core::time::Clock;
use storage::SessionStore;

use super::progress::SessionProgress;
use crate::mistakes::MistakeRecorder;
use crate::remote::{AnalyticsSink, PracticeAnalytics, SessionSaveApi, SessionSavePayload};

//
// ─── CONTEXT AND CONFIGURATION ─────────────────────────────────────────────────
//

/// Identity and environment of one practice run.
///
/// Built once per session and passed in; the engine reads no process-wide
/// state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub practice_set_id: PracticeSetId,
    pub wordlist_id: WordlistId,
    pub wordlist_name: String,
    /// Coarse device descriptor for analytics, e.g. "desktop" or "mobile".
    pub device_class: String,
}

/// Callback fired with the computed results on a completion path.
pub type CompletionCallback = Box<dyn FnMut(&SessionResults) + Send>;

/// Construction-time options: timer length and completion hooks.
#[derive(Default)]
pub struct EngineOptions {
    timer_minutes: Option<u32>,
    on_timer_expire: Option<CompletionCallback>,
    on_session_complete: Option<CompletionCallback>,
}

impl EngineOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the session against a countdown of `minutes`.
    #[must_use]
    pub fn timer_minutes(mut self, minutes: u32) -> Self {
        self.timer_minutes = Some(minutes);
        self
    }

    /// Hook invoked when the countdown reaches zero, before the completion
    /// hook.
    #[must_use]
    pub fn on_timer_expire(mut self, callback: impl FnMut(&SessionResults) + Send + 'static) -> Self {
        self.on_timer_expire = Some(Box::new(callback));
        self
    }

    /// Hook invoked on every completion path, expiry included.
    #[must_use]
    pub fn on_session_complete(
        mut self,
        callback: impl FnMut(&SessionResults) + Send + 'static,
    ) -> Self {
        self.on_session_complete = Some(Box::new(callback));
        self
    }
}

/// Injected collaborators. The remote pieces are optional; a missing piece
/// just skips its side effect.
#[derive(Clone)]
pub struct EngineDeps {
    store: SessionStore,
    saver: Option<Arc<dyn SessionSaveApi>>,
    analytics: Option<Arc<dyn AnalyticsSink>>,
    recorder: Option<MistakeRecorder>,
    clock: Clock,
}

impl EngineDeps {
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            saver: None,
            analytics: None,
            recorder: None,
            clock: Clock::default(),
        }
    }

    #[must_use]
    pub fn with_saver(mut self, saver: Arc<dyn SessionSaveApi>) -> Self {
        self.saver = Some(saver);
        self
    }

    #[must_use]
    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    #[must_use]
    pub fn with_mistake_recorder(mut self, recorder: MistakeRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Override the clock (deterministic tests).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// The practice session state machine.
///
/// Three states: active (default), paused (timer frozen, navigation and
/// answering still allowed), completed (terminal, every mutation is
/// ignored). All transitions run through `&mut self`; see
/// [`super::SessionTimer`] for driving [`SessionEngine::tick`] off a shared
/// handle.
///
/// Nothing here returns an error to the caller: storage trouble degrades to
/// "no snapshot", remote trouble is logged or queued, and misuse such as
/// answering a completed session is silently ignored.
pub struct SessionEngine {
    context: SessionContext,
    questions: QuestionSet,
    state: SessionState,
    deps: EngineDeps,
    on_timer_expire: Option<CompletionCallback>,
    on_session_complete: Option<CompletionCallback>,
    results: Option<SessionResults>,
}

impl SessionEngine {
    /// Build the engine, resuming a stored snapshot when one exists for the
    /// same practice set and is still fresh; otherwise starting clean at the
    /// first question with a full timer.
    #[must_use]
    pub fn new(
        context: SessionContext,
        questions: QuestionSet,
        deps: EngineDeps,
        options: EngineOptions,
    ) -> Self {
        let timer_total = options.timer_minutes.map(|minutes| minutes * 60);
        let state = Self::initial_state(&context, &questions, &deps, timer_total);
        let engine = Self {
            context,
            questions,
            state,
            deps,
            on_timer_expire: options.on_timer_expire,
            on_session_complete: options.on_session_complete,
            results: None,
        };
        engine.persist_snapshot();
        engine
    }

    fn initial_state(
        context: &SessionContext,
        questions: &QuestionSet,
        deps: &EngineDeps,
        timer_total: Option<u32>,
    ) -> SessionState {
        if let Some(snapshot) = deps.store.restore_snapshot() {
            if snapshot.practice_set_id == context.practice_set_id {
                let state = snapshot.state;
                if !state.is_completed && state.current_index < questions.total().max(1) {
                    debug!(session = %state.session_id, "resuming stored session");
                    return state;
                }
            } else {
                debug!("stored snapshot belongs to another practice set; starting fresh");
            }
        }
        SessionState::fresh(SessionId::random(), deps.clock.now(), timer_total)
    }

    //
    // ─── READ ACCESSORS ────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.state.session_id
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    #[must_use]
    pub fn current_question(&self) -> Option<QuestionRef<'_>> {
        self.questions.question_at(self.state.current_index)
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.total()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.state.answers.len()
    }

    /// Seconds left on the countdown; zero for untimed sessions.
    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.state.time_remaining
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.is_paused
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state.is_completed
    }

    /// Results computed on completion; `None` while the session runs.
    #[must_use]
    pub fn results(&self) -> Option<&SessionResults> {
        self.results.as_ref()
    }

    /// Read-only view of the raw session state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.total_questions();
        let answered = self.answered_count();
        // NOTE: question counts are tiny; the casts cannot lose precision.
        #[allow(clippy::cast_precision_loss)]
        let percent = if total == 0 {
            0.0
        } else {
            100.0 * answered as f64 / total as f64
        };
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            percent,
            is_complete: self.state.is_completed,
        }
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Jump to `index`. Out-of-range targets are ignored, not an error;
    /// every real move persists a snapshot.
    pub fn go_to_question(&mut self, index: usize) {
        if self.state.is_completed
            || index >= self.questions.total()
            || index == self.state.current_index
        {
            return;
        }
        self.state.current_index = index;
        self.persist_snapshot();
    }

    /// Advance one question; a no-op at the last one.
    pub fn next_question(&mut self) {
        self.go_to_question(self.state.current_index.saturating_add(1));
    }

    /// Step back one question; a no-op at the first one.
    pub fn previous_question(&mut self) {
        if self.state.current_index > 0 {
            self.go_to_question(self.state.current_index - 1);
        }
    }

    //
    // ─── ANSWERS AND TIMER ─────────────────────────────────────────────────────
    //

    /// Record (or overwrite) the learner's answer and persist a snapshot.
    /// Allowed while paused; ignored once completed.
    pub fn submit_answer(&mut self, question_id: QuestionId, answer: Answer) {
        if self.state.is_completed {
            return;
        }
        self.state.answers.insert(question_id, answer);
        self.persist_snapshot();
    }

    /// Freeze the timer. Navigation and answering stay available.
    pub fn pause(&mut self) {
        if self.state.is_completed || self.state.is_paused {
            return;
        }
        self.state.is_paused = true;
        self.persist_snapshot();
    }

    /// Unfreeze the timer.
    pub fn resume(&mut self) {
        if self.state.is_completed || !self.state.is_paused {
            return;
        }
        self.state.is_paused = false;
        self.persist_snapshot();
    }

    /// Advance the countdown by one second.
    ///
    /// Only timed, active sessions move; paused and completed sessions
    /// ignore the tick entirely, so paused time is frozen rather than
    /// slowed. Hitting zero completes the session through the expiry path.
    pub fn tick(&mut self) {
        if self.state.is_completed || self.state.is_paused || self.state.timer_total.is_none() {
            return;
        }
        self.state.time_remaining = self.state.time_remaining.saturating_sub(1);
        if self.state.time_remaining == 0 {
            self.complete(true);
        }
    }

    //
    // ─── COMPLETION ────────────────────────────────────────────────────────────
    //

    /// Finish the session now.
    ///
    /// Runs every terminal side effect except the expiry callback: score,
    /// local history, best-effort remote save, snapshot clear, mistake
    /// telemetry, analytics, completion callback. Calling it again once
    /// completed is ignored.
    pub fn complete_session(&mut self) {
        if self.state.is_completed {
            return;
        }
        self.complete(false);
    }

    /// Throw away all progress and start over under a new session identity.
    pub fn reset_session(&mut self) {
        self.deps.store.clear_snapshot();
        let timer_total = self.state.timer_total;
        self.state = SessionState::fresh(SessionId::random(), self.deps.clock.now(), timer_total);
        self.results = None;
        self.persist_snapshot();
    }

    fn complete(&mut self, expired: bool) {
        self.state.is_completed = true;
        let now = self.deps.clock.now();
        let results = calculate_results(
            &self.questions,
            &self.state.answers,
            self.state.session_id,
            self.state.started_at,
            now,
        );

        self.append_history(&results, now);
        self.spawn_remote_save(&results, now);
        self.deps.store.clear_snapshot();
        self.report_mistakes();
        self.spawn_analytics(&results);

        if expired {
            if let Some(callback) = self.on_timer_expire.as_mut() {
                callback(&results);
            }
        }
        if let Some(callback) = self.on_session_complete.as_mut() {
            callback(&results);
        }

        self.results = Some(results);
    }

    fn append_history(&self, results: &SessionResults, completed_at: DateTime<Utc>) {
        let item = HistoryItem {
            practice_set_id: self.context.practice_set_id.clone(),
            wordlist_id: self.context.wordlist_id.clone(),
            wordlist_name: self.context.wordlist_name.clone(),
            score: results.score,
            completed_at,
            duration_seconds: results.duration_seconds,
            question_types: self.questions.categories(),
        };
        if !self.deps.store.append_history(item) {
            warn!("completed session not recorded in local history");
        }
    }

    fn spawn_remote_save(&self, results: &SessionResults, end_time: DateTime<Utc>) {
        let Some(saver) = self.deps.saver.clone() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime; remote session save skipped");
            return;
        };
        let payload = SessionSavePayload {
            practice_set_id: self.context.practice_set_id.clone(),
            session_id: self.state.session_id,
            start_time: self.state.started_at,
            end_time,
            answers: self.state.answers.clone(),
            score: results.score,
            timer_duration: self.state.timer_total,
        };
        handle.spawn(async move {
            if let Err(err) = saver.save_session(&payload).await {
                debug!(%err, "remote session save failed; local history is authoritative");
            }
        });
    }

    /// One report per incorrectly answered vocabulary item; the recorder
    /// dedupes and batches from here.
    fn report_mistakes(&self) {
        let Some(recorder) = &self.deps.recorder else {
            return;
        };
        for question in self.questions.iter() {
            let answer = self.state.answers.get(question.id());
            if scoring::is_correct(question, answer) {
                continue;
            }
            for mistake in self.mistakes_for(question, answer) {
                recorder.record(mistake);
            }
        }
    }

    fn mistakes_for(&self, question: QuestionRef<'_>, answer: Option<&Answer>) -> Vec<Mistake> {
        let wordlist_id = self.context.wordlist_id.clone();
        match question {
            QuestionRef::Matching(q) => {
                let selected: HashMap<&str, &str> = match answer {
                    Some(Answer::Matching { pairs }) => pairs
                        .iter()
                        .map(|pair| (pair.source.as_str(), pair.target.as_str()))
                        .collect(),
                    _ => HashMap::new(),
                };
                q.pairs
                    .iter()
                    .filter(|pair| selected.get(pair.source.as_str()) != Some(&pair.target.as_str()))
                    .map(|pair| Mistake {
                        wordlist_id: wordlist_id.clone(),
                        word: pair.source.clone(),
                        translation: pair.target.clone(),
                        question_type: QuestionCategory::Matching,
                    })
                    .collect()
            }
            QuestionRef::FillBlank(q) => vec![Mistake {
                wordlist_id,
                word: q.answer.clone(),
                translation: q.sentence.clone(),
                question_type: QuestionCategory::FillBlank,
            }],
            QuestionRef::MultipleChoice(q) => {
                let translation = q
                    .correct_option()
                    .map(|option| option.text.clone())
                    .unwrap_or_default();
                vec![Mistake {
                    wordlist_id,
                    word: q.term.clone(),
                    translation,
                    question_type: QuestionCategory::MultipleChoice,
                }]
            }
        }
    }

    fn spawn_analytics(&self, results: &SessionResults) {
        let Some(sink) = self.deps.analytics.clone() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime; analytics record skipped");
            return;
        };
        let event = PracticeAnalytics {
            session_id: self.state.session_id,
            wordlist_id: self.context.wordlist_id.clone(),
            question_types: self.questions.categories(),
            total_questions: results.total_questions,
            score: results.score,
            duration_seconds: results.duration_seconds,
            device_class: self.context.device_class.clone(),
        };
        handle.spawn(async move {
            if sink.record(&event).await.is_err() {
                debug!("analytics record dropped");
            }
        });
    }

    /// A failed write here is logged and forgotten; navigation and scoring
    /// never stall on the snapshot.
    fn persist_snapshot(&self) {
        let snapshot = SessionSnapshot {
            practice_set_id: self.context.practice_set_id.clone(),
            state: self.state.clone(),
        };
        if !self.deps.store.save_snapshot(&snapshot) {
            debug!("session snapshot not saved; continuing without one");
        }
    }
}

impl fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEngine")
            .field("practice_set_id", &self.context.practice_set_id)
            .field("session_id", &self.state.session_id)
            .field("current_index", &self.state.current_index)
            .field("answered", &self.state.answers.len())
            .field("is_paused", &self.state.is_paused)
            .field("is_completed", &self.state.is_completed)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
