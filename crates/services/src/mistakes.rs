//! Missed-word telemetry: batches, dedupes, and queues reports so the
//! learner's flow is never blocked by the collector and nothing floods the
//! network.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info, warn};

use practice_core::model::{Mistake, QueuedMistake, QuestionCategory, WordlistId};
use practice_core::time::Clock;
use storage::MistakeQueue;

use crate::remote::{MistakeApi, MistakeReport};

/// Flush the pending buffer once it holds this many reports.
const MAX_BATCH: usize = 10;
/// ...or this long after the first report of a batch arrived, whichever
/// comes first.
const QUIET_INTERVAL: Duration = Duration::from_millis(500);
/// Spacing between consecutive sends within one flush. Reports go out
/// individually, not as one bulk request.
const SEND_SPACING: Duration = Duration::from_millis(100);

/// Supplies the learner credential attached to each report. `None` means
/// nobody is signed in; reports are then dropped, not queued and not sent.
pub type SessionTokenProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;

enum Command {
    Record(Mistake),
    Online,
}

/// Cloneable handle to the batching worker task.
///
/// Dropping every handle closes the channel; the worker flushes whatever is
/// still pending and exits.
#[derive(Clone)]
pub struct MistakeRecorder {
    tx: mpsc::UnboundedSender<Command>,
}

impl MistakeRecorder {
    /// Spawn the worker on the ambient tokio runtime. The durable queue is
    /// drained once at start.
    #[must_use]
    pub fn spawn(
        api: Arc<dyn MistakeApi>,
        queue: MistakeQueue,
        session_token: SessionTokenProvider,
    ) -> Self {
        Self::spawn_with_clock(api, queue, session_token, Clock::default())
    }

    /// Same as [`MistakeRecorder::spawn`] with an explicit clock for the
    /// queue timestamps.
    #[must_use]
    pub fn spawn_with_clock(
        api: Arc<dyn MistakeApi>,
        queue: MistakeQueue,
        session_token: SessionTokenProvider,
        clock: Clock,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            api,
            queue,
            session_token,
            clock,
            reported: HashSet::new(),
            pending: Vec::new(),
        };
        tokio::spawn(worker.run(rx));
        Self { tx }
    }

    /// Report a missed word. Cheap and non-blocking; batching, dedup, and
    /// delivery happen on the worker.
    pub fn record(&self, mistake: Mistake) {
        if self.tx.send(Command::Record(mistake)).is_err() {
            debug!("mistake recorder is shut down; report dropped");
        }
    }

    /// Signal an offline-to-online transition; the worker retries the
    /// durable queue.
    pub fn notify_online(&self) {
        if self.tx.send(Command::Online).is_err() {
            debug!("mistake recorder is shut down");
        }
    }
}

type DedupKey = (WordlistId, String, QuestionCategory);

struct Worker {
    api: Arc<dyn MistakeApi>,
    queue: MistakeQueue,
    session_token: SessionTokenProvider,
    clock: Clock,
    /// Keys that already produced a report this process; lives for the
    /// worker lifetime, never cleared.
    reported: HashSet<DedupKey>,
    pending: Vec<Mistake>,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        self.drain_queue().await;

        let mut deadline: Option<Instant> = None;
        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Record(mistake)) => {
                        if self.buffer(mistake) && deadline.is_none() {
                            deadline = Some(Instant::now() + QUIET_INTERVAL);
                        }
                        if self.pending.len() >= MAX_BATCH {
                            self.flush().await;
                            deadline = None;
                        }
                    }
                    Some(Command::Online) => self.drain_queue().await,
                    None => break,
                },
                () = wait_for(deadline), if deadline.is_some() => {
                    self.flush().await;
                    deadline = None;
                }
            }
        }
        self.flush().await;
    }

    /// Returns true when the mistake entered the pending buffer.
    fn buffer(&mut self, mistake: Mistake) -> bool {
        if (self.session_token)().is_none() {
            info!(word = %mistake.word, "no learner session; mistake report skipped");
            return false;
        }
        if !self.reported.insert(mistake.dedup_key()) {
            return false;
        }
        self.pending.push(mistake);
        true
    }

    async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.pending);
        let Some(token) = (self.session_token)() else {
            // Credential vanished between buffering and flush; these must
            // not be retried unauthenticated.
            info!(count = batch.len(), "learner session ended; mistake reports dropped");
            return;
        };

        let mut first = true;
        for mistake in batch {
            if !first {
                sleep(SEND_SPACING).await;
            }
            first = false;

            let report = MistakeReport::new(token.clone(), &mistake);
            if let Err(err) = self.api.record_mistake(&report).await {
                debug!(%err, word = %mistake.word, "mistake delivery failed; queued for retry");
                let queued = QueuedMistake {
                    mistake,
                    timestamp: self.clock.now(),
                };
                if !self.queue.push(queued) {
                    warn!("failed mistake could not be queued");
                }
            }
        }
    }

    async fn drain_queue(&mut self) {
        let items = self.queue.load();
        if items.is_empty() {
            return;
        }
        let Some(token) = (self.session_token)() else {
            debug!(count = items.len(), "offline queue kept; no learner session");
            return;
        };

        let mut remaining = Vec::new();
        let mut first = true;
        for queued in items {
            if !first {
                sleep(SEND_SPACING).await;
            }
            first = false;

            let report = MistakeReport::new(token.clone(), &queued.mistake);
            if self.api.record_mistake(&report).await.is_err() {
                remaining.push(queued);
            }
        }
        if !self.queue.replace(&remaining) {
            warn!("mistake queue rewrite failed");
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use storage::InMemoryStore;

    struct FakeApi {
        sent: Mutex<Vec<(MistakeReport, Instant)>>,
        fail: AtomicBool,
    }

    impl FakeApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
            })
        }

        fn sent_words(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(report, _)| report.word.clone())
                .collect()
        }

        fn send_offsets(&self, start: Instant) -> Vec<Duration> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, at)| *at - start)
                .collect()
        }
    }

    #[async_trait]
    impl MistakeApi for FakeApi {
        async fn record_mistake(&self, report: &MistakeReport) -> Result<(), RemoteError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(RemoteError::Disabled);
            }
            self.sent
                .lock()
                .unwrap()
                .push((report.clone(), Instant::now()));
            Ok(())
        }
    }

    fn with_token() -> SessionTokenProvider {
        Arc::new(|| Some("token-1".to_string()))
    }

    fn without_token() -> SessionTokenProvider {
        Arc::new(|| None)
    }

    fn mistake(word: &str) -> Mistake {
        Mistake {
            wordlist_id: WordlistId::new("wl-1"),
            word: word.to_string(),
            translation: "dog".to_string(),
            question_type: QuestionCategory::Matching,
        }
    }

    fn queue_on(kv: &InMemoryStore) -> MistakeQueue {
        MistakeQueue::new(Arc::new(kv.clone()))
    }

    #[tokio::test(start_paused = true)]
    async fn flushes_after_the_quiet_interval() {
        let api = FakeApi::new();
        let start = Instant::now();
        let recorder = MistakeRecorder::spawn(
            api.clone(),
            queue_on(&InMemoryStore::new()),
            with_token(),
        );

        recorder.record(mistake("Hund"));
        sleep(Duration::from_secs(2)).await;

        assert_eq!(api.sent_words(), vec!["Hund"]);
        assert_eq!(api.send_offsets(start), vec![QUIET_INTERVAL]);
    }

    #[tokio::test(start_paused = true)]
    async fn full_batch_flushes_without_waiting() {
        let api = FakeApi::new();
        let start = Instant::now();
        let recorder = MistakeRecorder::spawn(
            api.clone(),
            queue_on(&InMemoryStore::new()),
            with_token(),
        );

        for i in 0..MAX_BATCH {
            recorder.record(mistake(&format!("word-{i}")));
        }
        sleep(Duration::from_secs(5)).await;

        let offsets = api.send_offsets(start);
        assert_eq!(offsets.len(), MAX_BATCH);
        // First send fires immediately, well before the quiet interval.
        assert_eq!(offsets[0], Duration::ZERO);
        // Individual sends, spaced out.
        for pair in offsets.windows(2) {
            assert_eq!(pair[1] - pair[0], SEND_SPACING);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_reports_are_suppressed_for_the_process() {
        let api = FakeApi::new();
        let recorder = MistakeRecorder::spawn(
            api.clone(),
            queue_on(&InMemoryStore::new()),
            with_token(),
        );

        recorder.record(mistake("Hund"));
        recorder.record(mistake("Hund"));
        sleep(Duration::from_secs(2)).await;
        // Even across batches.
        recorder.record(mistake("Hund"));
        sleep(Duration::from_secs(2)).await;

        assert_eq!(api.sent_words(), vec!["Hund"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_delivery_queues_exactly_one_and_drains_later() {
        let api = FakeApi::new();
        api.fail.store(true, Ordering::SeqCst);
        let kv = InMemoryStore::new();
        let recorder = MistakeRecorder::spawn(api.clone(), queue_on(&kv), with_token());

        recorder.record(mistake("Hund"));
        recorder.record(mistake("Hund"));
        sleep(Duration::from_secs(2)).await;

        assert!(api.sent_words().is_empty());
        assert_eq!(queue_on(&kv).load().len(), 1);

        // Back online: the queued report goes out and leaves the queue.
        api.fail.store(false, Ordering::SeqCst);
        recorder.notify_online();
        sleep(Duration::from_secs(2)).await;

        assert_eq!(api.sent_words(), vec!["Hund"]);
        assert!(queue_on(&kv).load().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn still_failing_items_stay_queued() {
        let api = FakeApi::new();
        api.fail.store(true, Ordering::SeqCst);
        let kv = InMemoryStore::new();
        let recorder = MistakeRecorder::spawn(api.clone(), queue_on(&kv), with_token());

        recorder.record(mistake("Hund"));
        sleep(Duration::from_secs(2)).await;
        recorder.notify_online();
        sleep(Duration::from_secs(2)).await;

        assert_eq!(queue_on(&kv).load().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthenticated_reports_are_dropped_not_queued() {
        let api = FakeApi::new();
        let kv = InMemoryStore::new();
        let recorder = MistakeRecorder::spawn(api.clone(), queue_on(&kv), without_token());

        recorder.record(mistake("Hund"));
        sleep(Duration::from_secs(2)).await;

        assert!(api.sent_words().is_empty());
        assert!(queue_on(&kv).load().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn queue_drains_at_startup() {
        let api = FakeApi::new();
        let kv = InMemoryStore::new();
        let queue = queue_on(&kv);
        queue.push(QueuedMistake {
            mistake: mistake("Katze"),
            timestamp: practice_core::time::fixed_now(),
        });

        let _recorder = MistakeRecorder::spawn(api.clone(), queue, with_token());
        sleep(Duration::from_secs(1)).await;

        assert_eq!(api.sent_words(), vec!["Katze"]);
        assert!(queue_on(&kv).load().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_flushes_what_is_pending() {
        let api = FakeApi::new();
        let recorder = MistakeRecorder::spawn(
            api.clone(),
            queue_on(&InMemoryStore::new()),
            with_token(),
        );

        recorder.record(mistake("Hund"));
        drop(recorder);
        sleep(Duration::from_secs(1)).await;

        assert_eq!(api.sent_words(), vec!["Hund"]);
    }
}
