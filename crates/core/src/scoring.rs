//! Correctness predicates for each question kind.
//!
//! All of these are pure and total: a missing answer, or an answer of the
//! wrong kind, is simply incorrect.

use std::collections::HashMap;

use crate::model::{Answer, FillBlankQuestion, MatchPair, MatchingQuestion, QuestionRef};
use crate::results::round2;
use crate::similarity::similarity;

/// Minimum similarity against the canonical answer for a non-exact
/// fill-blank response to still be accepted. A four-out-of-five-letter
/// answer (similarity 0.8) is rejected.
pub const FUZZY_ACCEPT_THRESHOLD: f64 = 0.85;

/// Whether `answer` is a correct response to `question`.
#[must_use]
pub fn is_correct(question: QuestionRef<'_>, answer: Option<&Answer>) -> bool {
    match (question, answer) {
        (QuestionRef::Matching(q), Some(Answer::Matching { pairs })) => matching_correct(q, pairs),
        (QuestionRef::FillBlank(q), Some(Answer::FillBlank { text })) => fill_blank_correct(q, text),
        (QuestionRef::MultipleChoice(q), Some(Answer::MultipleChoice { selected })) => q
            .correct_option()
            .is_some_and(|option| option.text == *selected),
        _ => false,
    }
}

/// Partial-credit view of a matching answer, for display only. The boolean
/// predicate still requires every pair to be right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingBreakdown {
    pub correct: u32,
    pub total: u32,
    pub percentage: f64,
}

/// How many pairs of `question` the answer got right.
#[must_use]
pub fn matching_breakdown(
    question: &MatchingQuestion,
    answer: Option<&Answer>,
) -> MatchingBreakdown {
    let canonical = canonical_pairs(question);
    let total = u32::try_from(question.pairs.len()).unwrap_or(u32::MAX);

    let mut correct = 0_u32;
    if let Some(Answer::Matching { pairs }) = answer {
        for pair in pairs {
            if canonical.get(pair.source.as_str()) == Some(&pair.target.as_str()) {
                correct = correct.saturating_add(1);
            }
        }
    }
    let correct = correct.min(total);

    let percentage = if total == 0 {
        0.0
    } else {
        round2(100.0 * f64::from(correct) / f64::from(total))
    };

    MatchingBreakdown {
        correct,
        total,
        percentage,
    }
}

/// True iff the answer pairs every source term with its canonical target,
/// and pairs all of them. Order does not matter; a partial pairing fails.
fn matching_correct(question: &MatchingQuestion, pairs: &[MatchPair]) -> bool {
    if pairs.len() != question.pairs.len() {
        return false;
    }
    let canonical = canonical_pairs(question);
    pairs
        .iter()
        .all(|pair| canonical.get(pair.source.as_str()) == Some(&pair.target.as_str()))
}

fn canonical_pairs(question: &MatchingQuestion) -> HashMap<&str, &str> {
    question
        .pairs
        .iter()
        .map(|pair| (pair.source.as_str(), pair.target.as_str()))
        .collect()
}

/// Exact match against the canonical answer or any listed variation (all
/// compared trimmed and case-folded), with fuzzy fallback against the
/// canonical answer only.
fn fill_blank_correct(question: &FillBlankQuestion, text: &str) -> bool {
    let given = normalize(text);
    let canonical = normalize(&question.answer);
    if given == canonical {
        return true;
    }
    if question
        .acceptable
        .iter()
        .any(|variation| normalize(variation) == given)
    {
        return true;
    }
    similarity(&given, &canonical) >= FUZZY_ACCEPT_THRESHOLD
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
