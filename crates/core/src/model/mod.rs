mod ids;
mod quiz;
mod selection;
mod submission;

pub use ids::{AccountId, AnswerId, ParseIdError, QuestionId, QuizId};

pub use quiz::{Answer, Question, Quiz, QuizError};
pub use selection::AnswerSelection;
pub use submission::{Submission, SubmissionResult, SubmittedAnswer};
