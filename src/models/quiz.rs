//! Questions, answers and grading results

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Test, Video, VideoSummary};

/// What a question belongs to. A question has exactly one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionOwner {
    #[serde(rename = "test_id")]
    Test(i64),
    /// Control question asked after a video
    #[serde(rename = "video_id")]
    Video(i64),
}

impl QuestionOwner {
    /// Rebuild the owner from the nullable storage columns.
    pub fn from_columns(test_id: Option<i64>, video_id: Option<i64>) -> anyhow::Result<Self> {
        match (test_id, video_id) {
            (Some(test_id), None) => Ok(Self::Test(test_id)),
            (None, Some(video_id)) => Ok(Self::Video(video_id)),
            (Some(_), Some(_)) => Err(anyhow::anyhow!(
                "Question is attached to both a test and a video"
            )),
            (None, None) => Err(anyhow::anyhow!(
                "Question is attached to neither a test nor a video"
            )),
        }
    }

    /// `(test_id, video_id)` as stored
    pub fn to_columns(self) -> (Option<i64>, Option<i64>) {
        match self {
            Self::Test(id) => (Some(id), None),
            Self::Video(id) => (None, Some(id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: i64,
    #[serde(flatten)]
    pub owner: QuestionOwner,
    pub description: String,
    pub serial_number: i32,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer_id: i64,
    pub question_id: i64,
    pub description: String,
    /// Position shown to the learner; selections refer to it
    pub serial_number: i32,
    pub right: bool,
}

/// A question with its answer options in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionWithAnswers {
    #[serde(flatten)]
    pub question: Question,
    pub answers: Vec<Answer>,
}

impl QuestionWithAnswers {
    pub fn right_serials(&self) -> BTreeSet<i32> {
        self.answers
            .iter()
            .filter(|a| a.right)
            .map(|a| a.serial_number)
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuestionInput {
    #[serde(flatten)]
    pub owner: QuestionOwner,
    pub description: String,
    #[serde(default)]
    pub serial_number: i32,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Input for an answer; the serial number is assigned when missing.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAnswerInput {
    pub question_id: i64,
    pub description: String,
    #[serde(default)]
    pub serial_number: Option<i32>,
    #[serde(default)]
    pub right: bool,
}

/// A test ready to be taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestDetail {
    #[serde(flatten)]
    pub test: Test,
    pub questions: Vec<QuestionWithAnswers>,
}

/// A video with the material shown around it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoDetail {
    #[serde(flatten)]
    pub video: Video,
    pub summaries: Vec<VideoSummary>,
    pub question: Option<QuestionWithAnswers>,
}

/// Outcome for one question of a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionGrade {
    pub question_id: i64,
    pub serial_number: i32,
    pub correct: bool,
    /// Only filled when the test reveals right answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_answers: Option<BTreeSet<i32>>,
}

/// Outcome of a whole test attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestGrade {
    pub test_id: i64,
    pub correct: usize,
    pub total: usize,
    /// Whole-number score, rounded down
    pub percent: u8,
    pub passed: bool,
    pub questions: Vec<QuestionGrade>,
}
