//! Contracts for the remote collaborators: session saver, mistake collector,
//! analytics sink. All three are fire-and-forget from the engine's point of
//! view; payloads are opaque camelCase JSON owned by the collector.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use practice_core::model::{
    Answer, Mistake, PracticeSetId, QuestionCategory, QuestionId, SessionId, WordlistId,
};

use crate::error::RemoteError;

/// Payload for the remote session-save endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSavePayload {
    pub practice_set_id: PracticeSetId,
    pub session_id: SessionId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub answers: HashMap<QuestionId, Answer>,
    pub score: f64,
    pub timer_duration: Option<u32>,
}

/// One missed-word report, as the collector expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MistakeReport {
    pub session_token: String,
    pub wordlist_id: WordlistId,
    pub word: String,
    pub translation: String,
    pub question_type: QuestionCategory,
}

impl MistakeReport {
    #[must_use]
    pub fn new(session_token: String, mistake: &Mistake) -> Self {
        Self {
            session_token,
            wordlist_id: mistake.wordlist_id.clone(),
            word: mistake.word.clone(),
            translation: mistake.translation.clone(),
            question_type: mistake.question_type,
        }
    }
}

/// Best-effort usage record emitted once on every completion path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeAnalytics {
    pub session_id: SessionId,
    pub wordlist_id: WordlistId,
    pub question_types: Vec<QuestionCategory>,
    pub total_questions: u32,
    pub score: f64,
    pub duration_seconds: u64,
    pub device_class: String,
}

/// Remote endpoint that archives completed sessions.
///
/// Failures are logged and never retried; the local history log is the
/// authoritative record.
#[async_trait]
pub trait SessionSaveApi: Send + Sync {
    /// # Errors
    ///
    /// Returns `RemoteError` when the collector rejects the payload or the
    /// transport fails.
    async fn save_session(&self, payload: &SessionSavePayload) -> Result<(), RemoteError>;
}

/// Remote endpoint that aggregates missed-word telemetry.
#[async_trait]
pub trait MistakeApi: Send + Sync {
    /// # Errors
    ///
    /// Returns `RemoteError` when the collector rejects the report or the
    /// transport fails; the caller queues the report for retry.
    async fn record_mistake(&self, report: &MistakeReport) -> Result<(), RemoteError>;
}

/// Remote sink for anonymous usage analytics.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// # Errors
    ///
    /// Returns `RemoteError` on failure; callers swallow it.
    async fn record(&self, event: &PracticeAnalytics) -> Result<(), RemoteError>;
}
