use std::collections::HashMap;

use crate::model::ids::{AnswerId, QuestionId};
use crate::model::quiz::Quiz;
use crate::model::submission::SubmittedAnswer;

/// The answers a student has picked so far, one per question.
///
/// A question missing from the map is unanswered. Selecting again for the same
/// question replaces the previous choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSelection {
    chosen: HashMap<QuestionId, AnswerId>,
}

impl AnswerSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `answer` for `question`, returning the choice it replaced.
    pub fn select(&mut self, question: QuestionId, answer: AnswerId) -> Option<AnswerId> {
        self.chosen.insert(question, answer)
    }

    /// Forget the choice for `question`, returning it if there was one.
    pub fn clear(&mut self, question: &QuestionId) -> Option<AnswerId> {
        self.chosen.remove(question)
    }

    #[must_use]
    pub fn get(&self, question: &QuestionId) -> Option<&AnswerId> {
        self.chosen.get(question)
    }

    #[must_use]
    pub fn is_answered(&self, question: &QuestionId) -> bool {
        self.chosen.contains_key(question)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chosen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty()
    }

    pub fn clear_all(&mut self) {
        self.chosen.clear();
    }

    /// Build the submission answer list in the quiz's question order.
    ///
    /// Only answered questions are included.
    #[must_use]
    pub fn answers_for(&self, quiz: &Quiz) -> Vec<SubmittedAnswer> {
        quiz.questions
            .iter()
            .filter_map(|question| {
                self.chosen.get(&question.id).map(|answer| SubmittedAnswer {
                    question_id: question.id.clone(),
                    answer_id: answer.clone(),
                })
            })
            .collect()
    }
}
