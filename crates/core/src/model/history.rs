use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{PracticeSetId, WordlistId};
use super::question::QuestionCategory;

/// Immutable record of one completed session, kept in the bounded history
/// log independently of the live snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub practice_set_id: PracticeSetId,
    pub wordlist_id: WordlistId,
    pub wordlist_name: String,
    pub score: f64,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub question_types: Vec<QuestionCategory>,
}
