use serde::{Deserialize, Serialize};

use crate::model::ids::{AccountId, AnswerId, QuestionId, QuizId};

/// One answered question in a submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub answer_id: AnswerId,
}

/// Body of the quiz submission request.
///
/// Field names go over the wire as `quizId`, `accountId` and `answers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub quiz_id: QuizId,
    pub account_id: AccountId,
    pub answers: Vec<SubmittedAnswer>,
}

/// Graded result returned by the backend for a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub score: f64,
    pub total_correct: u32,
    pub total_questions: u32,
}

impl SubmissionResult {
    /// Share of correctly answered questions, in percent.
    ///
    /// Returns 0 for a quiz without questions.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        f64::from(self.total_correct) * 100.0 / f64::from(self.total_questions)
    }
}
