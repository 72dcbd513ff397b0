use gateway::{GatewayError, InMemoryGateway};
use logisim_core::model::{Answer, AnswerId, Question, QuestionId, Quiz, QuizId};

/// Id of the bundled offline quiz.
pub const DEMO_QUIZ_ID: &str = "demo";

fn question(id: &str, description: &str, answers: &[(&str, &str)]) -> Question {
    Question {
        id: QuestionId::new(id),
        description: description.into(),
        answers: answers
            .iter()
            .map(|(answer, text)| Answer {
                id: AnswerId::new(*answer),
                description: (*text).into(),
            })
            .collect(),
    }
}

/// A short logistics quiz for trying the exam flow without a backend.
#[must_use]
pub fn demo_quiz() -> Quiz {
    Quiz {
        id: QuizId::new(DEMO_QUIZ_ID),
        title: "Logistics fundamentals".into(),
        questions: vec![
            question(
                "fifo",
                "Which inventory policy ships the oldest stock first?",
                &[("fifo-a", "FIFO"), ("fifo-b", "LIFO"), ("fifo-c", "JIT")],
            ),
            question(
                "eoq",
                "The economic order quantity balances ordering cost against...",
                &[
                    ("eoq-a", "Holding cost"),
                    ("eoq-b", "Transport cost"),
                    ("eoq-c", "Labour cost"),
                ],
            ),
            question(
                "xdock",
                "Cross-docking mainly reduces...",
                &[("xdock-a", "Storage time"), ("xdock-b", "Fleet size")],
            ),
        ],
    }
}

/// In-memory backend preloaded with the demo quiz and its answer key.
///
/// # Errors
///
/// Returns `GatewayError` if the quiz cannot be stored.
pub fn demo_gateway() -> Result<InMemoryGateway, GatewayError> {
    let repo = InMemoryGateway::new();
    repo.insert_quiz(
        demo_quiz(),
        [
            (QuestionId::new("fifo"), AnswerId::new("fifo-a")),
            (QuestionId::new("eoq"), AnswerId::new("eoq-a")),
            (QuestionId::new("xdock"), AnswerId::new("xdock-a")),
        ],
    )?;
    Ok(repo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_quiz_is_well_formed() {
        assert!(demo_quiz().validate().is_ok());
    }
}
