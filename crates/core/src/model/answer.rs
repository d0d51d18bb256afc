use serde::{Deserialize, Serialize};

use super::question::{MatchPair, QuestionCategory};

/// A learner's answer, mirroring the question kinds.
///
/// Answers never reference their question; the engine keys them by
/// `QuestionId` in a plain map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Answer {
    Matching { pairs: Vec<MatchPair> },
    FillBlank { text: String },
    MultipleChoice { selected: String },
}

impl Answer {
    #[must_use]
    pub fn category(&self) -> QuestionCategory {
        match self {
            Answer::Matching { .. } => QuestionCategory::Matching,
            Answer::FillBlank { .. } => QuestionCategory::FillBlank,
            Answer::MultipleChoice { .. } => QuestionCategory::MultipleChoice,
        }
    }
}
