use async_trait::async_trait;
use logisim_core::model::Quiz;
use services::{ExamCommand, ExamNotice, ExamProgress, SubmitConfirmation, SubmitMode};
use tokio::sync::{mpsc, oneshot};

//
// ─── INPUT ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(ExamCommand),
    Help,
    Empty,
}

pub const HELP: &str = "\
commands:
  select <question> <answer>   choose an answer (alias: s)
  clear <question>             forget the answer for a question
  submit                       hand in now (asks for confirmation)
  status                       show progress and time left
  reset                        start the attempt over
  quit                         leave";

/// Parse one line typed by the student.
///
/// # Errors
///
/// Returns a short message when the line is not a known command.
pub fn parse_input(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Input::Empty);
    };
    let args: Vec<&str> = words.collect();

    let command = match (head.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("select" | "s", [question, answer]) => ExamCommand::Select {
            question: (*question).into(),
            answer: (*answer).into(),
        },
        ("select" | "s", _) => return Err("usage: select <question> <answer>".into()),
        ("clear", [question]) => ExamCommand::Clear {
            question: (*question).into(),
        },
        ("clear", _) => return Err("usage: clear <question>".into()),
        ("submit", []) => ExamCommand::Submit,
        ("status", []) => ExamCommand::Status,
        ("reset", []) => ExamCommand::Reset,
        ("quit" | "exit" | "q", []) => ExamCommand::Quit,
        ("help" | "?", _) => return Ok(Input::Help),
        (other, _) => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(Input::Command(command))
}

#[must_use]
pub fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

//
// ─── CONFIRMATION ──────────────────────────────────────────────────────────────
//

/// A pending yes/no question for the input loop to answer.
#[derive(Debug)]
pub struct ConfirmRequest {
    pub prompt: String,
    pub reply: oneshot::Sender<bool>,
}

/// Asks on the terminal by handing the question to the input loop, which owns stdin.
#[derive(Debug, Clone)]
pub struct TerminalConfirmation {
    requests: mpsc::UnboundedSender<ConfirmRequest>,
}

impl TerminalConfirmation {
    #[must_use]
    pub fn new(requests: mpsc::UnboundedSender<ConfirmRequest>) -> Self {
        Self { requests }
    }
}

#[async_trait]
impl SubmitConfirmation for TerminalConfirmation {
    async fn confirm(&self, progress: &ExamProgress) -> bool {
        let prompt = if progress.unanswered() > 0 {
            format!(
                "{} of {} questions are unanswered. Submit anyway? [y/N]",
                progress.unanswered(),
                progress.total_questions
            )
        } else {
            "Submit your answers now? [y/N]".to_string()
        };

        let (reply, answer) = oneshot::channel();
        if self.requests.send(ConfirmRequest { prompt, reply }).is_err() {
            return false;
        }
        answer.await.unwrap_or(false)
    }
}

//
// ─── OUTPUT ────────────────────────────────────────────────────────────────────
//

#[must_use]
pub fn render_quiz(quiz: &Quiz) -> String {
    let mut out = String::new();
    if !quiz.title.is_empty() {
        out.push_str(&format!("== {} ==\n", quiz.title));
    }
    for question in &quiz.questions {
        out.push_str(&format!("[{}] {}\n", question.id, question.description));
        for answer in &question.answers {
            out.push_str(&format!("    ({}) {}\n", answer.id, answer.description));
        }
    }
    out
}

fn render_progress(progress: &ExamProgress) -> String {
    format!(
        "{} | {}/{} answered | {} left",
        progress.state.label(),
        progress.answered,
        progress.total_questions,
        progress.countdown()
    )
}

/// Text for a notice, or `None` when it is not worth printing.
///
/// Ticks are only shown on whole minutes and during the last ten seconds.
#[must_use]
pub fn render_notice(notice: &ExamNotice) -> Option<String> {
    match notice {
        ExamNotice::Loaded(quiz) => Some(render_quiz(quiz).trim_end().to_string()),
        ExamNotice::Started(progress) => {
            Some(format!("Quiz started. {}", render_progress(progress)))
        }
        ExamNotice::Tick { remaining }
            if *remaining > 0 && (*remaining % 60 == 0 || *remaining <= 10) =>
        {
            Some(format!("{}:{:02} left", remaining / 60, remaining % 60))
        }
        ExamNotice::Tick { .. } => None,
        ExamNotice::Expired => Some("Time is up.".into()),
        ExamNotice::Submitting { .. } => Some("Submitting...".into()),
        ExamNotice::Submitted { message, .. } => Some(message.clone()),
        ExamNotice::SubmitFailed {
            mode: SubmitMode::Auto,
            error,
        } => Some(format!(
            "Automatic submission failed: {error}. Answers are locked; retrying."
        )),
        ExamNotice::SubmitFailed { error, .. } => {
            let hint = if error.is_retryable() {
                " Type `submit` to try again."
            } else {
                ""
            };
            Some(format!("Submission failed: {error}.{hint}"))
        }
        ExamNotice::SubmitDeclined => Some("Submission cancelled.".into()),
        ExamNotice::Reset(progress) => {
            Some(format!("Attempt restarted. {}", render_progress(progress)))
        }
        ExamNotice::Status(progress) => Some(render_progress(progress)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway::GatewayError;
    use services::{ExamState, SessionError};

    #[test]
    fn parses_select_and_alias() {
        assert_eq!(
            parse_input("select fifo fifo-a").unwrap(),
            Input::Command(ExamCommand::Select {
                question: "fifo".into(),
                answer: "fifo-a".into(),
            })
        );
        assert!(matches!(
            parse_input("  S eoq eoq-b ").unwrap(),
            Input::Command(ExamCommand::Select { .. })
        ));
    }

    #[test]
    fn rejects_bad_arity_and_unknown_words() {
        assert!(parse_input("select fifo").is_err());
        assert!(parse_input("submit now").is_err());
        assert_eq!(
            parse_input("dance").unwrap_err(),
            "unknown command: dance (try `help`)"
        );
    }

    #[test]
    fn blank_line_is_empty() {
        assert_eq!(parse_input("   ").unwrap(), Input::Empty);
        assert_eq!(parse_input("help").unwrap(), Input::Help);
    }

    #[test]
    fn quiz_lists_question_and_answer_ids() {
        let text = render_quiz(&crate::demo::demo_quiz());
        assert!(text.starts_with("== Logistics fundamentals ==\n"));
        assert!(text.contains("[fifo] Which inventory policy ships the oldest stock first?\n"));
        assert!(text.contains("    (fifo-a) FIFO\n"));
    }

    #[test]
    fn yes_answers() {
        assert!(is_yes(" Y "));
        assert!(is_yes("yes"));
        assert!(!is_yes(""));
        assert!(!is_yes("nope"));
    }

    #[test]
    fn ticks_are_throttled() {
        assert_eq!(render_notice(&ExamNotice::Tick { remaining: 299 }), None);
        assert_eq!(
            render_notice(&ExamNotice::Tick { remaining: 240 }).as_deref(),
            Some("4:00 left")
        );
        assert_eq!(
            render_notice(&ExamNotice::Tick { remaining: 7 }).as_deref(),
            Some("0:07 left")
        );
        assert_eq!(render_notice(&ExamNotice::Tick { remaining: 0 }), None);
    }

    #[test]
    fn failure_suggests_retry_for_network_errors() {
        let text = render_notice(&ExamNotice::SubmitFailed {
            mode: SubmitMode::Manual,
            error: SessionError::Submit(GatewayError::Network("timeout".into())),
        })
        .unwrap();
        assert!(text.ends_with("Type `submit` to try again."));
    }

    #[test]
    fn failed_auto_submission_says_it_retries() {
        let text = render_notice(&ExamNotice::SubmitFailed {
            mode: SubmitMode::Auto,
            error: SessionError::Unauthenticated,
        })
        .unwrap();
        assert!(text.starts_with("Automatic submission failed: no signed-in account"));
        assert!(text.ends_with("retrying."));
    }

    #[test]
    fn status_line() {
        let progress = ExamProgress {
            total_questions: 3,
            answered: 1,
            remaining_secs: 125,
            state: ExamState::InProgress,
        };
        assert_eq!(
            render_notice(&ExamNotice::Status(progress)).as_deref(),
            Some("in progress | 1/3 answered | 2:05 left")
        );
    }

    #[tokio::test]
    async fn confirmation_round_trips_through_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let confirm = TerminalConfirmation::new(tx);
        let progress = ExamProgress {
            total_questions: 2,
            answered: 1,
            remaining_secs: 10,
            state: ExamState::InProgress,
        };

        let asker = tokio::spawn(async move { confirm.confirm(&progress).await });
        let request = rx.recv().await.unwrap();
        assert!(request.prompt.starts_with("1 of 2 questions are unanswered"));
        request.reply.send(true).unwrap();
        assert!(asker.await.unwrap());
    }

    #[tokio::test]
    async fn confirmation_declines_when_nobody_listens() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let confirm = TerminalConfirmation::new(tx);
        let progress = ExamProgress {
            total_questions: 1,
            answered: 1,
            remaining_secs: 10,
            state: ExamState::InProgress,
        };
        assert!(!confirm.confirm(&progress).await);
    }
}
