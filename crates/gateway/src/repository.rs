use async_trait::async_trait;
use logisim_core::model::{
    AccountId, AnswerId, QuestionId, Quiz, QuizId, Submission, SubmissionResult,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by backend adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("not found")]
    NotFound,

    #[error("network error: {0}")]
    Network(String),

    #[error("rejected by server: {0}")]
    Validation(String),

    #[error("not signed in")]
    Unauthenticated,

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Source of quizzes to attempt.
#[async_trait]
pub trait QuizSource: Send + Sync {
    /// Fetch a quiz with its nested questions and answers.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NotFound` if the quiz does not exist, or
    /// `GatewayError::Network` if the backend cannot be reached.
    async fn fetch_quiz(&self, id: &QuizId) -> Result<Quiz, GatewayError>;
}

/// Destination for finished attempts; grades them and returns the result.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Submit the answers of an attempt.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Validation` for a malformed payload, or
    /// `GatewayError::Network` if the backend cannot be reached.
    async fn submit_quiz(&self, submission: &Submission) -> Result<SubmissionResult, GatewayError>;
}

/// Who is currently signed in.
pub trait SessionIdentity: Send + Sync {
    /// Returns `None` when nobody is signed in.
    fn current_account_id(&self) -> Option<AccountId>;
}

/// In-memory backend for tests and offline demos.
///
/// Holds quizzes together with their answer keys and grades submissions
/// locally. Every accepted or failed submission is recorded.
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    quizzes: Arc<Mutex<HashMap<QuizId, Quiz>>>,
    keys: Arc<Mutex<HashMap<QuizId, HashMap<QuestionId, AnswerId>>>>,
    submissions: Arc<Mutex<Vec<Submission>>>,
    failures: Arc<Mutex<u32>>,
}

impl InMemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a quiz along with the correct answer for each question.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Network` if the internal lock is poisoned.
    pub fn insert_quiz(
        &self,
        quiz: Quiz,
        key: impl IntoIterator<Item = (QuestionId, AnswerId)>,
    ) -> Result<(), GatewayError> {
        let id = quiz.id.clone();
        self.keys
            .lock()
            .map_err(|e| GatewayError::Network(e.to_string()))?
            .insert(id.clone(), key.into_iter().collect());
        self.quizzes
            .lock()
            .map_err(|e| GatewayError::Network(e.to_string()))?
            .insert(id, quiz);
        Ok(())
    }

    /// Make the next `count` submissions fail with a network error.
    pub fn fail_next_submissions(&self, count: u32) {
        if let Ok(mut guard) = self.failures.lock() {
            *guard = count;
        }
    }

    /// Every submission received so far, including failed ones.
    #[must_use]
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn grade(&self, submission: &Submission) -> Result<SubmissionResult, GatewayError> {
        let quizzes = self
            .quizzes
            .lock()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        let quiz = quizzes
            .get(&submission.quiz_id)
            .ok_or(GatewayError::NotFound)?;

        for answer in &submission.answers {
            if !quiz.accepts(&answer.question_id, &answer.answer_id) {
                return Err(GatewayError::Validation(format!(
                    "unknown answer {} for question {}",
                    answer.answer_id, answer.question_id
                )));
            }
        }

        let keys = self
            .keys
            .lock()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        let key = keys.get(&submission.quiz_id);
        let total_correct = submission
            .answers
            .iter()
            .filter(|answer| {
                key.and_then(|k| k.get(&answer.question_id)) == Some(&answer.answer_id)
            })
            .count();

        let total_correct = u32::try_from(total_correct)
            .map_err(|_| GatewayError::Validation("too many answers".into()))?;
        let total_questions = u32::try_from(quiz.question_count())
            .map_err(|_| GatewayError::Serialization("too many questions".into()))?;
        let score = if total_questions == 0 {
            0.0
        } else {
            f64::from(total_correct) * 100.0 / f64::from(total_questions)
        };

        Ok(SubmissionResult {
            score,
            total_correct,
            total_questions,
        })
    }
}

#[async_trait]
impl QuizSource for InMemoryGateway {
    async fn fetch_quiz(&self, id: &QuizId) -> Result<Quiz, GatewayError> {
        let guard = self
            .quizzes
            .lock()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        guard.get(id).cloned().ok_or(GatewayError::NotFound)
    }
}

#[async_trait]
impl SubmissionSink for InMemoryGateway {
    async fn submit_quiz(&self, submission: &Submission) -> Result<SubmissionResult, GatewayError> {
        self.submissions
            .lock()
            .map_err(|e| GatewayError::Network(e.to_string()))?
            .push(submission.clone());

        {
            let mut failures = self
                .failures
                .lock()
                .map_err(|e| GatewayError::Network(e.to_string()))?;
            if *failures > 0 {
                *failures -= 1;
                return Err(GatewayError::Network("connection reset".into()));
            }
        }

        self.grade(submission)
    }
}

/// Aggregates the quiz and submission endpoints behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Gateway {
    pub quizzes: Arc<dyn QuizSource>,
    pub submissions: Arc<dyn SubmissionSink>,
}

impl Gateway {
    #[must_use]
    pub fn in_memory(repo: InMemoryGateway) -> Self {
        let quizzes: Arc<dyn QuizSource> = Arc::new(repo.clone());
        let submissions: Arc<dyn SubmissionSink> = Arc::new(repo);
        Self {
            quizzes,
            submissions,
        }
    }
}
