use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::QuestionId;

/// One source/target vocabulary pairing inside a matching question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub source: String,
    pub target: String,
}

/// Match-the-pairs question.
///
/// `pairs` holds the canonical pairings; `shuffled_targets` is the
/// presentation order the provider baked in, so every learner of the same
/// set sees the same layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingQuestion {
    pub id: QuestionId,
    pub pairs: Vec<MatchPair>,
    pub shuffled_targets: Vec<String>,
}

/// Fill-in-the-blank question with a canonical answer and optional accepted
/// alternate spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillBlankQuestion {
    pub id: QuestionId,
    pub sentence: String,
    pub answer: String,
    #[serde(default)]
    pub acceptable: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub text: String,
    pub is_correct: bool,
}

/// Multiple-choice question for one target term.
///
/// The provider guarantees exactly one option is flagged correct; this core
/// consumes the set as already validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleChoiceQuestion {
    pub id: QuestionId,
    pub sentence: String,
    pub term: String,
    pub options: Vec<ChoiceOption>,
}

impl MultipleChoiceQuestion {
    /// The option flagged correct.
    #[must_use]
    pub fn correct_option(&self) -> Option<&ChoiceOption> {
        self.options.iter().find(|option| option.is_correct)
    }
}

/// Question kind, used for result breakdowns, history records, and mistake
/// telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionCategory {
    Matching,
    FillBlank,
    MultipleChoice,
}

impl fmt::Display for QuestionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuestionCategory::Matching => "matching",
            QuestionCategory::FillBlank => "fillBlank",
            QuestionCategory::MultipleChoice => "multipleChoice",
        };
        write!(f, "{name}")
    }
}

/// Borrowed view of one question, whichever kind it is.
///
/// Scoring and navigation match on this exhaustively, so adding a question
/// kind refuses to compile until every call site handles it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuestionRef<'a> {
    Matching(&'a MatchingQuestion),
    FillBlank(&'a FillBlankQuestion),
    MultipleChoice(&'a MultipleChoiceQuestion),
}

impl<'a> QuestionRef<'a> {
    #[must_use]
    pub fn id(&self) -> &'a QuestionId {
        match *self {
            QuestionRef::Matching(q) => &q.id,
            QuestionRef::FillBlank(q) => &q.id,
            QuestionRef::MultipleChoice(q) => &q.id,
        }
    }

    #[must_use]
    pub fn category(&self) -> QuestionCategory {
        match self {
            QuestionRef::Matching(_) => QuestionCategory::Matching,
            QuestionRef::FillBlank(_) => QuestionCategory::FillBlank,
            QuestionRef::MultipleChoice(_) => QuestionCategory::MultipleChoice,
        }
    }
}

/// Pre-built set of questions for one word list, in provider shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet {
    #[serde(default)]
    pub matching: Vec<MatchingQuestion>,
    #[serde(default)]
    pub fill_blank: Vec<FillBlankQuestion>,
    #[serde(default)]
    pub multiple_choice: Vec<MultipleChoiceQuestion>,
}

impl QuestionSet {
    /// Total number of questions across all categories.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matching.len() + self.fill_blank.len() + self.multiple_choice.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Question at `index` in navigation order: matching first, then
    /// fill-blank, then multiple-choice.
    #[must_use]
    pub fn question_at(&self, index: usize) -> Option<QuestionRef<'_>> {
        let mut index = index;
        if index < self.matching.len() {
            return Some(QuestionRef::Matching(&self.matching[index]));
        }
        index -= self.matching.len();
        if index < self.fill_blank.len() {
            return Some(QuestionRef::FillBlank(&self.fill_blank[index]));
        }
        index -= self.fill_blank.len();
        self.multiple_choice.get(index).map(QuestionRef::MultipleChoice)
    }

    /// Iterate all questions in navigation order.
    pub fn iter(&self) -> impl Iterator<Item = QuestionRef<'_>> {
        self.matching
            .iter()
            .map(QuestionRef::Matching)
            .chain(self.fill_blank.iter().map(QuestionRef::FillBlank))
            .chain(self.multiple_choice.iter().map(QuestionRef::MultipleChoice))
    }

    /// Categories with at least one question, in navigation order.
    #[must_use]
    pub fn categories(&self) -> Vec<QuestionCategory> {
        let mut present = Vec::new();
        if !self.matching.is_empty() {
            present.push(QuestionCategory::Matching);
        }
        if !self.fill_blank.is_empty() {
            present.push(QuestionCategory::FillBlank);
        }
        if !self.multiple_choice.is_empty() {
            present.push(QuestionCategory::MultipleChoice);
        }
        present
    }
}
