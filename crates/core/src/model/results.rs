use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ids::SessionId;
use super::question::QuestionCategory;

/// Per-category slice of a session result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub total: u32,
    pub correct: u32,
    /// Percentage in `[0, 100]`, rounded to two decimals.
    pub score: f64,
}

/// Scored outcome of one completed session.
///
/// The breakdown only carries categories that had questions; an absent
/// category is absent, never a zero row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResults {
    pub session_id: SessionId,
    pub total_questions: u32,
    pub correct_answers: u32,
    /// Overall percentage in `[0, 100]`, rounded to two decimals.
    pub score: f64,
    pub duration_seconds: u64,
    pub breakdown: BTreeMap<QuestionCategory, CategoryScore>,
}
