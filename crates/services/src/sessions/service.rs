use std::sync::Arc;

use gateway::{GatewayError, QuizSource, SessionIdentity, SubmissionSink};
use logisim_core::model::{QuizId, Submission, SubmissionResult};

use super::session::{ExamSession, SubmitMode, TickOutcome};
use crate::config::ExamConfig;
use crate::confirm::{FixedConfirmation, SubmitConfirmation};
use crate::error::SessionError;
use crate::Clock;

/// Result of a submit request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Graded by the backend. The session is now `Completed`.
    Submitted {
        mode: SubmitMode,
        result: SubmissionResult,
    },
    /// The student backed out of the confirmation prompt.
    Declined,
    /// The session was not accepting submissions (already submitting or done).
    Ignored,
}

impl SubmitOutcome {
    /// Message shown to the student after the request settles.
    #[must_use]
    pub fn notice(&self) -> Option<String> {
        match self {
            SubmitOutcome::Submitted {
                mode: SubmitMode::Auto,
                result,
            } => Some(format!(
                "Time is up! Your quiz was submitted automatically. Score: {} ({}/{} correct).",
                result.score, result.total_correct, result.total_questions
            )),
            SubmitOutcome::Submitted {
                mode: SubmitMode::Manual,
                result,
            } => Some(format!(
                "Quiz submitted successfully. Score: {} ({}/{} correct).",
                result.score, result.total_correct, result.total_questions
            )),
            SubmitOutcome::Declined | SubmitOutcome::Ignored => None,
        }
    }
}

/// A submission that passed the guard and still has to reach the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub mode: SubmitMode,
    pub submission: Submission,
}

impl PendingSubmission {
    /// Hand the payload to the sink.
    ///
    /// # Errors
    ///
    /// Returns whatever `GatewayError` the sink reports.
    pub async fn send(&self, sink: &dyn SubmissionSink) -> Result<SubmissionResult, GatewayError> {
        sink.submit_quiz(&self.submission).await
    }
}

/// Drives `ExamSession` against the backend collaborators.
#[derive(Clone)]
pub struct ExamService {
    clock: Clock,
    config: ExamConfig,
    quizzes: Arc<dyn QuizSource>,
    submissions: Arc<dyn SubmissionSink>,
    identity: Arc<dyn SessionIdentity>,
    confirmation: Arc<dyn SubmitConfirmation>,
}

impl ExamService {
    /// Manual submissions are accepted without asking until
    /// `with_confirmation` installs a prompt.
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizSource>,
        submissions: Arc<dyn SubmissionSink>,
        identity: Arc<dyn SessionIdentity>,
    ) -> Self {
        Self {
            clock,
            config: ExamConfig::default(),
            quizzes,
            submissions,
            identity,
            confirmation: Arc::new(FixedConfirmation::accept()),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ExamConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_confirmation(mut self, confirmation: Arc<dyn SubmitConfirmation>) -> Self {
        self.confirmation = confirmation;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    #[must_use]
    pub fn sink(&self) -> Arc<dyn SubmissionSink> {
        Arc::clone(&self.submissions)
    }

    /// A fresh session in `Loading`, sized by the configured duration.
    #[must_use]
    pub fn new_session(&self) -> ExamSession {
        ExamSession::new(self.config.duration_secs)
    }

    /// Fetch the quiz and move the session into `InProgress`.
    ///
    /// Does nothing if the session is past `Loading`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` if the quiz cannot be fetched. The session
    /// stays in `Loading` and the caller may try again.
    pub async fn start(
        &self,
        session: &mut ExamSession,
        quiz_id: &QuizId,
    ) -> Result<(), SessionError> {
        if session.state() != super::ExamState::Loading {
            log::debug!("start({quiz_id}) ignored in state {:?}", session.state());
            return Ok(());
        }

        let quiz = self.quizzes.fetch_quiz(quiz_id).await.map_err(|err| {
            log::warn!("failed to load quiz {quiz_id}: {err}");
            SessionError::Load(err)
        })?;

        if let Err(err) = quiz.validate() {
            log::warn!("quiz {quiz_id} looks malformed: {err}");
        }
        log::info!(
            "quiz {quiz_id} loaded with {} questions, {}s on the clock",
            quiz.question_count(),
            self.config.duration_secs
        );
        session.load(quiz, self.clock.now());
        Ok(())
    }

    /// Ask the student whether to submit now.
    pub async fn confirm_manual(&self, session: &ExamSession) -> bool {
        let accepted = self.confirmation.confirm(&session.progress()).await;
        if !accepted {
            log::debug!("manual submission declined");
        }
        accepted
    }

    /// Pass the at-most-once guard and freeze the session for submission.
    ///
    /// Returns `Ok(None)` when the session is not in `InProgress`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unauthenticated` when nobody is signed in. The
    /// session stays `InProgress`; after an expiry the next tick retries.
    pub fn prepare_submission(
        &self,
        session: &mut ExamSession,
        mode: SubmitMode,
    ) -> Result<Option<PendingSubmission>, SessionError> {
        if !session.is_in_progress() {
            log::debug!("{mode:?} submission dropped in state {:?}", session.state());
            return Ok(None);
        }
        let Some(account) = self.identity.current_account_id() else {
            if mode == SubmitMode::Auto {
                session.release_expiry();
            }
            log::warn!("{mode:?} submission refused: nobody is signed in");
            return Err(SessionError::Unauthenticated);
        };

        Ok(session
            .begin_submit(mode, account)
            .map(|submission| PendingSubmission { mode, submission }))
    }

    /// Apply the sink's answer to the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Submit` when the sink failed; the session is back
    /// in `InProgress` with its answers and clock as they were.
    pub fn finish_submission(
        &self,
        session: &mut ExamSession,
        mode: SubmitMode,
        outcome: Result<SubmissionResult, GatewayError>,
    ) -> Result<SubmitOutcome, SessionError> {
        match outcome {
            Ok(result) => {
                if session.complete_submit(result.clone(), self.clock.now()).is_none() {
                    return Ok(SubmitOutcome::Ignored);
                }
                log::info!(
                    "{mode:?} submission graded: {}/{} correct",
                    result.total_correct,
                    result.total_questions
                );
                Ok(SubmitOutcome::Submitted { mode, result })
            }
            Err(err) => {
                session.fail_submit();
                log::warn!("{mode:?} submission failed: {err}");
                Err(SessionError::Submit(err))
            }
        }
    }

    /// Submit the session's answers.
    ///
    /// Manual submissions ask for confirmation first. Only answered
    /// questions are sent.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unauthenticated` without a signed-in account and
    /// `SessionError::Submit` when the sink fails; in both cases the session is
    /// `InProgress` afterwards and the call can be retried.
    pub async fn submit(
        &self,
        session: &mut ExamSession,
        mode: SubmitMode,
    ) -> Result<SubmitOutcome, SessionError> {
        if !session.is_in_progress() {
            return Ok(SubmitOutcome::Ignored);
        }
        if mode == SubmitMode::Manual && !self.confirm_manual(session).await {
            return Ok(SubmitOutcome::Declined);
        }

        let Some(pending) = self.prepare_submission(session, mode)? else {
            return Ok(SubmitOutcome::Ignored);
        };
        let outcome = pending.send(self.submissions.as_ref()).await;
        self.finish_submission(session, pending.mode, outcome)
    }

    /// Advance the countdown one second, submitting automatically when it runs out.
    ///
    /// Returns `Ok(None)` for ordinary ticks.
    ///
    /// # Errors
    ///
    /// Propagates errors from the automatic submission. The session is then
    /// `InProgress` again and the following tick retries it.
    pub async fn tick(
        &self,
        session: &mut ExamSession,
    ) -> Result<Option<SubmitOutcome>, SessionError> {
        match session.tick() {
            TickOutcome::Expired => {
                log::info!("time is up, submitting automatically");
                self.submit(session, SubmitMode::Auto).await.map(Some)
            }
            TickOutcome::Running { .. } | TickOutcome::Ignored => Ok(None),
        }
    }

    /// Restart the attempt. Returns false if the session was loading or submitting.
    pub fn reset(&self, session: &mut ExamSession) -> bool {
        let applied = session.reset(self.clock.now());
        if applied {
            log::debug!("session reset");
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway::{InMemoryGateway, StaticIdentity};
    use logisim_core::model::{AccountId, Answer, AnswerId, Question, QuestionId, Quiz};
    use logisim_core::time::fixed_now;

    use crate::sessions::ExamState;

    fn build_quiz() -> Quiz {
        Quiz {
            id: QuizId::new("q1"),
            title: String::new(),
            questions: vec![Question {
                id: QuestionId::new("a"),
                description: String::new(),
                answers: vec![
                    Answer {
                        id: AnswerId::new("a1"),
                        description: String::new(),
                    },
                    Answer {
                        id: AnswerId::new("a2"),
                        description: String::new(),
                    },
                ],
            }],
        }
    }

    fn build_service(repo: &InMemoryGateway, identity: StaticIdentity) -> ExamService {
        repo.insert_quiz(build_quiz(), [(QuestionId::new("a"), AnswerId::new("a1"))])
            .unwrap();
        ExamService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(identity),
        )
    }

    #[tokio::test]
    async fn start_failure_stays_loading() {
        let repo = InMemoryGateway::new();
        let service = build_service(&repo, StaticIdentity::signed_in(AccountId::new("acc")));
        let mut session = service.new_session();

        let err = service
            .start(&mut session, &QuizId::new("missing"))
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::Load(GatewayError::NotFound));
        assert_eq!(session.state(), ExamState::Loading);

        service.start(&mut session, &QuizId::new("q1")).await.unwrap();
        assert_eq!(session.state(), ExamState::InProgress);
    }

    #[tokio::test]
    async fn unauthenticated_submit_leaves_session_in_progress() {
        let repo = InMemoryGateway::new();
        let service = build_service(&repo, StaticIdentity::signed_out());
        let mut session = service.new_session();
        service.start(&mut session, &QuizId::new("q1")).await.unwrap();

        let err = service
            .submit(&mut session, SubmitMode::Manual)
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::Unauthenticated);
        assert_eq!(session.state(), ExamState::InProgress);
        assert!(repo.submissions().is_empty());
    }

    #[tokio::test]
    async fn declined_confirmation_keeps_progress() {
        let repo = InMemoryGateway::new();
        let service = build_service(&repo, StaticIdentity::signed_in(AccountId::new("acc")))
            .with_confirmation(Arc::new(FixedConfirmation::decline()));
        let mut session = service.new_session();
        service.start(&mut session, &QuizId::new("q1")).await.unwrap();

        let outcome = service.submit(&mut session, SubmitMode::Manual).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Declined);
        assert_eq!(session.state(), ExamState::InProgress);
        assert!(repo.submissions().is_empty());
    }

    #[tokio::test]
    async fn auto_submission_skips_confirmation() {
        let repo = InMemoryGateway::new();
        let service = build_service(&repo, StaticIdentity::signed_in(AccountId::new("acc")))
            .with_confirmation(Arc::new(FixedConfirmation::decline()));
        let mut session = service.new_session();
        service.start(&mut session, &QuizId::new("q1")).await.unwrap();

        let outcome = service.submit(&mut session, SubmitMode::Auto).await.unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::Submitted {
                mode: SubmitMode::Auto,
                ..
            }
        ));
        assert_eq!(session.submitted_at(), Some(fixed_now()));
    }

    #[test]
    fn notices_differ_between_modes() {
        let result = SubmissionResult {
            score: 100.0,
            total_correct: 1,
            total_questions: 1,
        };
        let auto = SubmitOutcome::Submitted {
            mode: SubmitMode::Auto,
            result: result.clone(),
        };
        let manual = SubmitOutcome::Submitted {
            mode: SubmitMode::Manual,
            result,
        };
        assert!(auto.notice().unwrap().starts_with("Time is up!"));
        assert!(manual.notice().unwrap().starts_with("Quiz submitted successfully."));
        assert_eq!(SubmitOutcome::Declined.notice(), None);
    }
}
