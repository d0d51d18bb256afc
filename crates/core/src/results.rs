//! Rolls per-question correctness into a scored, categorized session result.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::model::{
    Answer, CategoryScore, QuestionId, QuestionSet, SessionId, SessionResults,
};
use crate::scoring;

/// Round to two decimal places, the precision scores are reported in.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score every question in `set` against `answers` and produce the session
/// result.
///
/// Categories with no questions are left out of the breakdown entirely. An
/// empty set scores zero without dividing. Duration is whole seconds since
/// `started_at`, never negative. Deterministic for fixed inputs and `now`.
#[must_use]
pub fn calculate_results(
    set: &QuestionSet,
    answers: &HashMap<QuestionId, Answer>,
    session_id: SessionId,
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> SessionResults {
    let mut breakdown = BTreeMap::new();
    let mut total = 0_u32;
    let mut correct = 0_u32;

    for question in set.iter() {
        let answer = answers.get(question.id());
        let entry = breakdown
            .entry(question.category())
            .or_insert(CategoryScore {
                total: 0,
                correct: 0,
                score: 0.0,
            });
        entry.total = entry.total.saturating_add(1);
        total = total.saturating_add(1);
        if scoring::is_correct(question, answer) {
            entry.correct = entry.correct.saturating_add(1);
            correct = correct.saturating_add(1);
        }
    }

    for category in breakdown.values_mut() {
        category.score = percentage(category.correct, category.total);
    }

    let duration = now.signed_duration_since(started_at).num_seconds();
    let duration_seconds = u64::try_from(duration.max(0)).unwrap_or(0);

    SessionResults {
        session_id,
        total_questions: total,
        correct_answers: correct,
        score: percentage(correct, total),
        duration_seconds,
        breakdown,
    }
}

fn percentage(correct: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(100.0 * f64::from(correct) / f64::from(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ChoiceOption, FillBlankQuestion, MatchPair, MatchingQuestion, MultipleChoiceQuestion,
        QuestionCategory,
    };
    use crate::time::fixed_now;
    use chrono::Duration;

    fn full_set() -> QuestionSet {
        QuestionSet {
            matching: vec![MatchingQuestion {
                id: QuestionId::new("m1"),
                pairs: vec![MatchPair {
                    source: "Hund".to_string(),
                    target: "dog".to_string(),
                }],
                shuffled_targets: vec!["dog".to_string()],
            }],
            fill_blank: vec![FillBlankQuestion {
                id: QuestionId::new("f1"),
                sentence: "___".to_string(),
                answer: "klein".to_string(),
                acceptable: Vec::new(),
            }],
            multiple_choice: vec![MultipleChoiceQuestion {
                id: QuestionId::new("c1"),
                sentence: "Die Katze schläft.".to_string(),
                term: "Katze".to_string(),
                options: vec![
                    ChoiceOption {
                        text: "cat".to_string(),
                        is_correct: true,
                    },
                    ChoiceOption {
                        text: "dog".to_string(),
                        is_correct: false,
                    },
                ],
            }],
        }
    }

    fn all_correct_answers() -> HashMap<QuestionId, Answer> {
        let mut answers = HashMap::new();
        answers.insert(
            QuestionId::new("m1"),
            Answer::Matching {
                pairs: vec![MatchPair {
                    source: "Hund".to_string(),
                    target: "dog".to_string(),
                }],
            },
        );
        answers.insert(
            QuestionId::new("f1"),
            Answer::FillBlank {
                text: "klein".to_string(),
            },
        );
        answers.insert(
            QuestionId::new("c1"),
            Answer::MultipleChoice {
                selected: "cat".to_string(),
            },
        );
        answers
    }

    #[test]
    fn all_correct_scores_one_hundred() {
        let start = fixed_now();
        let results = calculate_results(
            &full_set(),
            &all_correct_answers(),
            SessionId::random(),
            start,
            start + Duration::seconds(90),
        );

        assert_eq!(results.total_questions, 3);
        assert_eq!(results.correct_answers, 3);
        assert!((results.score - 100.0).abs() < 1e-9);
        assert_eq!(results.duration_seconds, 90);
        assert_eq!(results.breakdown.len(), 3);
        for category in results.breakdown.values() {
            assert_eq!(category.total, 1);
            assert_eq!(category.correct, 1);
        }
    }

    #[test]
    fn one_of_three_rounds_to_a_third() {
        let mut answers = HashMap::new();
        answers.insert(
            QuestionId::new("f1"),
            Answer::FillBlank {
                text: "klein".to_string(),
            },
        );
        let start = fixed_now();
        let results =
            calculate_results(&full_set(), &answers, SessionId::random(), start, start);

        assert_eq!(results.correct_answers, 1);
        assert!((results.score - 33.33).abs() < 1e-9);
        assert!((results.breakdown[&QuestionCategory::FillBlank].score - 100.0).abs() < 1e-9);
        assert!((results.breakdown[&QuestionCategory::Matching].score - 0.0).abs() < 1e-9);
    }

    #[test]
    fn absent_categories_are_omitted_not_zeroed() {
        let set = QuestionSet {
            fill_blank: vec![FillBlankQuestion {
                id: QuestionId::new("f1"),
                sentence: "___".to_string(),
                answer: "klein".to_string(),
                acceptable: Vec::new(),
            }],
            ..QuestionSet::default()
        };
        let results = calculate_results(
            &set,
            &HashMap::new(),
            SessionId::random(),
            fixed_now(),
            fixed_now(),
        );

        assert_eq!(results.breakdown.len(), 1);
        assert!(results.breakdown.contains_key(&QuestionCategory::FillBlank));
        assert!(!results.breakdown.contains_key(&QuestionCategory::Matching));
    }

    #[test]
    fn empty_set_scores_zero_without_dividing() {
        let results = calculate_results(
            &QuestionSet::default(),
            &HashMap::new(),
            SessionId::random(),
            fixed_now(),
            fixed_now(),
        );
        assert_eq!(results.total_questions, 0);
        assert!((results.score - 0.0).abs() < 1e-9);
        assert!(results.breakdown.is_empty());
    }

    #[test]
    fn duration_never_goes_negative() {
        let start = fixed_now();
        let results = calculate_results(
            &QuestionSet::default(),
            &HashMap::new(),
            SessionId::random(),
            start,
            start - Duration::seconds(10),
        );
        assert_eq!(results.duration_seconds, 0);
    }
}
