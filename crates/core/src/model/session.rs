use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::answer::Answer;
use super::ids::{PracticeSetId, QuestionId, SessionId};

/// Mutable state of one practice session.
///
/// Owned exclusively by a single engine instance; serialized verbatim as the
/// resumable snapshot. `current_index` stays within the question set and
/// `time_remaining` within `[0, timer_total]` whenever a timer is configured;
/// the engine upholds both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub current_index: usize,
    #[serde(default)]
    pub answers: HashMap<QuestionId, Answer>,
    pub is_paused: bool,
    /// Configured timer length in seconds; `None` for untimed sessions.
    pub timer_total: Option<u32>,
    pub time_remaining: u32,
    pub is_completed: bool,
}

impl SessionState {
    /// Fresh state for a new session: first question, no answers, full timer.
    #[must_use]
    pub fn fresh(
        session_id: SessionId,
        started_at: DateTime<Utc>,
        timer_total: Option<u32>,
    ) -> Self {
        Self {
            session_id,
            started_at,
            current_index: 0,
            answers: HashMap::new(),
            is_paused: false,
            timer_total,
            time_remaining: timer_total.unwrap_or(0),
            is_completed: false,
        }
    }
}

/// Durable wrapper pairing session state with the practice set it belongs
/// to, so restore can reject snapshots from another set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub practice_set_id: PracticeSetId,
    pub state: SessionState,
}
