//! Quiz grading
//!
//! A test question counts as correct only when the learner picked exactly the
//! right options. A video control question needs a single right option.

use crate::models::{QuestionGrade, QuestionWithAnswers, TestDetail, TestGrade};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    /// A test without questions cannot be graded
    #[error("Test {0} has no questions")]
    EmptyTest(i64),

    #[error("Invalid answer selection: {0}")]
    InvalidSelection(String),
}

/// Parse a selection such as `"1, 3"` into answer serial numbers.
pub fn parse_selection(raw: &str) -> Result<BTreeSet<i32>, QuizError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(QuizError::InvalidSelection("no answer chosen".to_string()));
    }
    raw.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<i32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    QuizError::InvalidSelection(format!("'{}' is not an answer number", part))
                })
        })
        .collect()
}

/// Grade one attempt. `selections[i]` answers the i-th question in display
/// order; missing selections count as wrong.
pub fn grade_test(
    test: &TestDetail,
    selections: &[BTreeSet<i32>],
    pass_percent: u8,
) -> Result<TestGrade, QuizError> {
    if test.questions.is_empty() {
        return Err(QuizError::EmptyTest(test.test.test_id));
    }

    let empty = BTreeSet::new();
    let questions: Vec<QuestionGrade> = test
        .questions
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let chosen = selections.get(i).unwrap_or(&empty);
            let right = question.right_serials();
            QuestionGrade {
                question_id: question.question.question_id,
                serial_number: question.question.serial_number,
                correct: *chosen == right,
                right_answers: test.test.show_right_answer.then_some(right),
            }
        })
        .collect();

    let total = questions.len();
    let correct = questions.iter().filter(|q| q.correct).count();
    let percent = (correct * 100 / total) as u8;

    Ok(TestGrade {
        test_id: test.test.test_id,
        correct,
        total,
        percent,
        passed: percent >= pass_percent,
        questions,
    })
}

pub fn check_video_answer(question: &QuestionWithAnswers, chosen: i32) -> bool {
    question.right_serials().contains(&chosen)
}
