//! Data models
//!
//! Catalog entities, learners and payments, plus the set and graph types the
//! progression engine works on.

mod content;
mod progress;
mod quiz;
mod tariff;
mod user;

pub use content::{
    ContentKind, ContentRef, ContentSet, CreateLessonInput, CreatePracticeInput,
    CreateTestInput, CreateTopicInput, CreateVideoInput, CreateVideoSummaryInput, Lesson,
    PerKind, Practice, Test, Topic, UnlockEdge, Video, VideoSummary,
};
pub use progress::{
    AvailableContent, CourseOutline, NextStep, NextStepParams, OutlineNode, OutlinePosition,
    ProgressReport, TestSubmission, UnlockOutcome, UserProgressState, VideoAnswer, UNTITLED,
};
pub use quiz::{
    Answer, CreateAnswerInput, CreateQuestionInput, Question, QuestionGrade, QuestionOwner,
    QuestionWithAnswers, TestDetail, TestGrade, VideoDetail,
};
pub use tariff::{
    CreatePaymentInput, CreateTariffInput, Payment, Tariff, TariffActivation, TariffStatus,
};
pub use user::{ContactInput, CreateUserInput, TelegramUser, UserContact, UserProfile, UserRole};
