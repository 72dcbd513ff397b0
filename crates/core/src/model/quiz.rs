use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AnswerId, QuestionId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz has no questions")]
    NoQuestions,

    #[error("question {0} has no answers")]
    NoAnswers(QuestionId),

    #[error("duplicate question id {0}")]
    DuplicateQuestion(QuestionId),

    #[error("duplicate answer id {answer} in question {question}")]
    DuplicateAnswer {
        question: QuestionId,
        answer: AnswerId,
    },
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// One selectable option of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    #[serde(default)]
    pub description: String,
}

/// A single question with its ordered answer options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl Question {
    /// Returns true if `answer` is one of this question's options.
    #[must_use]
    pub fn has_answer(&self, answer: &AnswerId) -> bool {
        self.answers.iter().any(|a| &a.id == answer)
    }

    #[must_use]
    pub fn answer(&self, answer: &AnswerId) -> Option<&Answer> {
        self.answers.iter().find(|a| &a.id == answer)
    }
}

/// A quiz as served by the backend, questions kept in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Quiz {
    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Returns true if `answer` is a valid option for `question`.
    #[must_use]
    pub fn accepts(&self, question: &QuestionId, answer: &AnswerId) -> bool {
        self.question(question).is_some_and(|q| q.has_answer(answer))
    }

    /// Checks structural sanity of a quiz fetched from the backend.
    ///
    /// An empty quiz is still playable (it submits an empty answer list), so this
    /// is advisory and only used for logging by the session layer.
    ///
    /// # Errors
    ///
    /// Returns the first `QuizError` found.
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }

        let mut seen = std::collections::HashSet::new();
        for question in &self.questions {
            if !seen.insert(&question.id) {
                return Err(QuizError::DuplicateQuestion(question.id.clone()));
            }
            if question.answers.is_empty() {
                return Err(QuizError::NoAnswers(question.id.clone()));
            }
            let mut answers = std::collections::HashSet::new();
            for answer in &question.answers {
                if !answers.insert(&answer.id) {
                    return Err(QuizError::DuplicateAnswer {
                        question: question.id.clone(),
                        answer: answer.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Quiz {
        serde_json::from_str(
            r#"{
                "id": "q1",
                "title": "Warehousing basics",
                "questions": [
                    {"id": "a", "description": "FIFO means?", "answers": [
                        {"id": "a1", "description": "First in, first out"},
                        {"id": "a2", "description": "Fast in, fast out"}
                    ]},
                    {"id": "b", "description": "Pick a dock", "answers": [{"id": "b1"}]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn quiz_deserializes_nested_payload() {
        let quiz = sample();
        assert_eq!(quiz.id, QuizId::new("q1"));
        assert_eq!(quiz.question_count(), 2);
        assert_eq!(quiz.questions[1].answers[0].description, "");
        assert!(quiz.validate().is_ok());
    }

    #[test]
    fn accepts_only_known_pairs() {
        let quiz = sample();
        assert!(quiz.accepts(&"a".into(), &"a2".into()));
        assert!(!quiz.accepts(&"a".into(), &"b1".into()));
        assert!(!quiz.accepts(&"z".into(), &"a1".into()));
    }

    #[test]
    fn validate_flags_duplicates() {
        let mut quiz = sample();
        quiz.questions[1].id = QuestionId::new("a");
        assert_eq!(
            quiz.validate(),
            Err(QuizError::DuplicateQuestion(QuestionId::new("a")))
        );
    }

    #[test]
    fn validate_flags_empty_quiz() {
        let quiz = Quiz {
            id: QuizId::new("empty"),
            title: String::new(),
            questions: Vec::new(),
        };
        assert_eq!(quiz.validate(), Err(QuizError::NoQuestions));
    }
}
