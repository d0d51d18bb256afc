use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::WordlistId;
use super::question::QuestionCategory;

/// A missed word: the learner answered this vocabulary item incorrectly in
/// the given question kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mistake {
    pub wordlist_id: WordlistId,
    pub word: String,
    pub translation: String,
    pub question_type: QuestionCategory,
}

impl Mistake {
    /// Key for suppression of repeat reports. The translation is display
    /// data and does not participate.
    #[must_use]
    pub fn dedup_key(&self) -> (WordlistId, String, QuestionCategory) {
        (
            self.wordlist_id.clone(),
            self.word.clone(),
            self.question_type,
        )
    }
}

/// A mistake whose delivery failed, parked in the durable offline queue
/// until a retry succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMistake {
    #[serde(flatten)]
    pub mistake: Mistake,
    pub timestamp: DateTime<Utc>,
}
