use chrono::{DateTime, Utc};
use std::fmt;

use logisim_core::model::{
    AccountId, AnswerId, AnswerSelection, QuestionId, Quiz, Submission, SubmissionResult,
};
use logisim_core::SessionClock;

use super::progress::ExamProgress;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a single quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamState {
    /// Waiting for the quiz to arrive. Initial state.
    Loading,
    /// Answers may be changed and the clock is running.
    InProgress,
    /// A submission is in flight. Answers are frozen and ticks are ignored.
    Submitting,
    /// Graded. Terminal until `reset`.
    Completed,
}

impl ExamState {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ExamState::Loading => "loading",
            ExamState::InProgress => "in progress",
            ExamState::Submitting => "submitting",
            ExamState::Completed => "completed",
        }
    }
}

/// Who asked for the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// The student pressed submit and confirmed.
    Manual,
    /// The countdown reached zero.
    Auto,
}

/// What a single `tick` did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Outside the running window; nothing changed.
    Ignored,
    /// One second elapsed.
    Running { remaining: u32 },
    /// This tick ran the clock out. Happens once per attempt.
    Expired,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State machine for one timed quiz attempt, from load to graded result.
///
/// This type does no I/O. `ExamService` fetches and submits on its behalf by
/// calling `load`, `begin_submit` and then `complete_submit` or `fail_submit`.
/// Every operation outside its valid state is a silent no-op that returns
/// `false` or `None`.
///
/// `begin_submit` is the at-most-once guard: it succeeds only from
/// `InProgress` and immediately moves to `Submitting`, so a racing second
/// request (double click, or the clock running out mid-flight) is dropped.
pub struct ExamSession {
    state: ExamState,
    quiz: Option<Quiz>,
    selection: AnswerSelection,
    clock: SessionClock,
    expired: bool,
    pending: Option<SubmitMode>,
    result: Option<SubmissionResult>,
    attempts: u32,
    started_at: Option<DateTime<Utc>>,
    submitted_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    #[must_use]
    pub fn new(duration_secs: u32) -> Self {
        Self {
            state: ExamState::Loading,
            quiz: None,
            selection: AnswerSelection::new(),
            clock: SessionClock::new(duration_secs),
            expired: false,
            pending: None,
            result: None,
            attempts: 0,
            started_at: None,
            submitted_at: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ExamState {
        self.state
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.state == ExamState::InProgress
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    #[must_use]
    pub fn selection(&self) -> &AnswerSelection {
        &self.selection
    }

    #[must_use]
    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.clock.remaining()
    }

    /// True once the countdown has run out in this attempt.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    #[must_use]
    pub fn result(&self) -> Option<&SubmissionResult> {
        self.result.as_ref()
    }

    /// Mode of the submission currently in flight.
    #[must_use]
    pub fn pending_mode(&self) -> Option<SubmitMode> {
        self.pending
    }

    /// Number of submissions handed to the sink in this attempt, failed ones included.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    #[must_use]
    pub fn progress(&self) -> ExamProgress {
        ExamProgress {
            total_questions: self.quiz.as_ref().map_or(0, Quiz::question_count),
            answered: self.selection.len(),
            remaining_secs: self.clock.remaining(),
            state: self.state,
        }
    }

    /// Install the fetched quiz and start the attempt. `Loading` only.
    pub fn load(&mut self, quiz: Quiz, now: DateTime<Utc>) -> bool {
        if self.state != ExamState::Loading {
            return false;
        }
        self.quiz = Some(quiz);
        self.begin_attempt(now);
        true
    }

    /// Choose `answer` for `question`, replacing any earlier choice.
    ///
    /// Ignored outside `InProgress`, once the clock has run out, and for ids
    /// that are not part of the quiz.
    pub fn select_answer(&mut self, question: QuestionId, answer: AnswerId) -> bool {
        if !self.accepts_edits() {
            return false;
        }
        let known = self
            .quiz
            .as_ref()
            .is_some_and(|quiz| quiz.accepts(&question, &answer));
        if !known {
            log::debug!("ignoring unknown selection {question}={answer}");
            return false;
        }
        self.selection.select(question, answer);
        true
    }

    /// Drop the choice for `question`. Returns true if one was removed.
    pub fn clear_answer(&mut self, question: &QuestionId) -> bool {
        if !self.accepts_edits() {
            return false;
        }
        self.selection.clear(question).is_some()
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `TickOutcome::Expired` once when the clock runs out; the caller
    /// is expected to start an automatic submission in response. Later ticks
    /// are ignored until that submission fails (see `release_expiry`) or the
    /// session is reset.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != ExamState::InProgress || self.expired {
            return TickOutcome::Ignored;
        }
        if self.clock.tick() || self.clock.is_expired() {
            self.expired = true;
            return TickOutcome::Expired;
        }
        TickOutcome::Running {
            remaining: self.clock.remaining(),
        }
    }

    /// Freeze the answers and build the payload for the sink.
    ///
    /// Returns `None` unless the session is `InProgress`.
    pub fn begin_submit(&mut self, mode: SubmitMode, account: AccountId) -> Option<Submission> {
        if self.state != ExamState::InProgress {
            return None;
        }
        let quiz = self.quiz.as_ref()?;
        let submission = Submission {
            quiz_id: quiz.id.clone(),
            account_id: account,
            answers: self.selection.answers_for(quiz),
        };
        self.state = ExamState::Submitting;
        self.pending = Some(mode);
        self.attempts += 1;
        Some(submission)
    }

    /// Record the graded result. `Submitting` only.
    pub fn complete_submit(
        &mut self,
        result: SubmissionResult,
        now: DateTime<Utc>,
    ) -> Option<SubmitMode> {
        if self.state != ExamState::Submitting {
            return None;
        }
        self.state = ExamState::Completed;
        self.result = Some(result);
        self.submitted_at = Some(now);
        self.pending.take()
    }

    /// Return to `InProgress` after the sink rejected the submission.
    ///
    /// Answers and the remaining time are exactly as they were when the
    /// submission began. If the clock is already at zero the next tick
    /// reports `Expired` again so the automatic submission is retried.
    pub fn fail_submit(&mut self) -> Option<SubmitMode> {
        if self.state != ExamState::Submitting {
            return None;
        }
        self.state = ExamState::InProgress;
        self.release_expiry();
        self.pending.take()
    }

    /// Let the next tick report `Expired` again after an automatic submission
    /// could not go out. Only applies while `InProgress` with the clock at zero.
    pub fn release_expiry(&mut self) -> bool {
        if self.state != ExamState::InProgress || !self.clock.is_expired() {
            return false;
        }
        self.expired = false;
        true
    }

    /// Start over with a full clock and no answers. `Completed` or `InProgress` only.
    pub fn reset(&mut self, now: DateTime<Utc>) -> bool {
        if !matches!(self.state, ExamState::Completed | ExamState::InProgress) {
            return false;
        }
        self.begin_attempt(now);
        true
    }

    fn accepts_edits(&self) -> bool {
        self.state == ExamState::InProgress && !self.clock.is_expired()
    }

    fn begin_attempt(&mut self, now: DateTime<Utc>) {
        self.state = ExamState::InProgress;
        self.selection.clear_all();
        self.clock.reset();
        self.expired = false;
        self.pending = None;
        self.result = None;
        self.attempts = 0;
        self.started_at = Some(now);
        self.submitted_at = None;
    }
}

impl Default for ExamSession {
    fn default() -> Self {
        Self::new(logisim_core::EXAM_DURATION_SECS)
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("state", &self.state)
            .field("quiz_id", &self.quiz.as_ref().map(|q| &q.id))
            .field("answered", &self.selection.len())
            .field("remaining", &self.clock.remaining())
            .field("expired", &self.expired)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use logisim_core::model::{Answer, Question, QuizId, SubmittedAnswer};
    use logisim_core::time::fixed_now;

    fn build_quiz() -> Quiz {
        let question = |id: &str, answers: &[&str]| Question {
            id: QuestionId::new(id),
            description: format!("Question {id}"),
            answers: answers
                .iter()
                .map(|a| Answer {
                    id: AnswerId::new(*a),
                    description: String::new(),
                })
                .collect(),
        };
        Quiz {
            id: QuizId::new("q1"),
            title: "Inventory".into(),
            questions: vec![question("a", &["a1", "a2"]), question("b", &["b1", "b2"])],
        }
    }

    fn in_progress() -> ExamSession {
        let mut session = ExamSession::default();
        assert!(session.load(build_quiz(), fixed_now()));
        session
    }

    fn result() -> SubmissionResult {
        SubmissionResult {
            score: 50.0,
            total_correct: 1,
            total_questions: 2,
        }
    }

    #[test]
    fn starts_loading_and_ignores_input() {
        let mut session = ExamSession::default();
        assert_eq!(session.state(), ExamState::Loading);
        assert!(!session.select_answer("a".into(), "a1".into()));
        assert_eq!(session.tick(), TickOutcome::Ignored);
        assert!(session.begin_submit(SubmitMode::Manual, "acc".into()).is_none());
        assert!(!session.reset(fixed_now()));
        assert_eq!(session.remaining_secs(), 300);
    }

    #[test]
    fn load_enters_progress_with_full_clock() {
        let session = in_progress();
        assert_eq!(session.state(), ExamState::InProgress);
        assert_eq!(session.remaining_secs(), 300);
        assert!(session.selection().is_empty());
        assert_eq!(session.started_at(), Some(fixed_now()));
    }

    #[test]
    fn second_load_is_ignored() {
        let mut session = in_progress();
        let mut other = build_quiz();
        other.id = QuizId::new("other");
        assert!(!session.load(other, fixed_now()));
        assert_eq!(session.quiz().unwrap().id, QuizId::new("q1"));
    }

    #[test]
    fn last_selection_per_question_wins() {
        let mut session = in_progress();
        let calls = [("a", "a1"), ("b", "b2"), ("a", "a2"), ("b", "b1"), ("a", "a1")];
        for (q, a) in calls {
            assert!(session.select_answer(q.into(), a.into()));
        }
        assert!(session.clear_answer(&"b".into()));
        assert!(!session.clear_answer(&"b".into()));

        assert_eq!(session.selection().len(), 1);
        assert_eq!(
            session.selection().get(&"a".into()),
            Some(&AnswerId::new("a1"))
        );
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut session = in_progress();
        assert!(!session.select_answer("a".into(), "b1".into()));
        assert!(!session.select_answer("zzz".into(), "a1".into()));
        assert!(session.selection().is_empty());
    }

    #[test]
    fn clock_expires_exactly_once() {
        let mut session = in_progress();
        let mut expired = 0;
        for _ in 0..300 {
            if session.tick() == TickOutcome::Expired {
                expired += 1;
            }
        }
        assert_eq!(expired, 1);
        assert_eq!(session.remaining_secs(), 0);
        assert_eq!(session.tick(), TickOutcome::Ignored);
        assert!(session.is_expired());
    }

    #[test]
    fn tick_reports_remaining() {
        let mut session = in_progress();
        assert_eq!(session.tick(), TickOutcome::Running { remaining: 299 });
    }

    #[test]
    fn begin_submit_is_guarded() {
        let mut session = in_progress();
        session.select_answer("a".into(), "a1".into());

        let first = session.begin_submit(SubmitMode::Manual, "acc-1".into());
        let second = session.begin_submit(SubmitMode::Manual, "acc-1".into());

        let submission = first.unwrap();
        assert!(second.is_none());
        assert_eq!(session.state(), ExamState::Submitting);
        assert_eq!(session.attempts(), 1);
        assert_eq!(
            submission.answers,
            vec![SubmittedAnswer {
                question_id: "a".into(),
                answer_id: "a1".into(),
            }]
        );
    }

    #[test]
    fn selection_is_frozen_while_submitting() {
        let mut session = in_progress();
        session.select_answer("a".into(), "a1".into());
        session.begin_submit(SubmitMode::Manual, "acc-1".into());

        assert!(!session.select_answer("a".into(), "a2".into()));
        assert!(!session.clear_answer(&"a".into()));
        assert_eq!(session.tick(), TickOutcome::Ignored);
        assert_eq!(session.remaining_secs(), 300);
    }

    #[test]
    fn expiry_during_manual_submit_cannot_double_submit() {
        let mut session = ExamSession::new(1);
        session.load(build_quiz(), fixed_now());
        assert!(session.begin_submit(SubmitMode::Manual, "acc".into()).is_some());
        assert_eq!(session.tick(), TickOutcome::Ignored);
        assert!(session.begin_submit(SubmitMode::Auto, "acc".into()).is_none());
    }

    #[test]
    fn failed_submit_restores_progress_untouched() {
        let mut session = in_progress();
        session.select_answer("b".into(), "b2".into());
        session.tick();
        let before = session.selection().clone();

        session.begin_submit(SubmitMode::Manual, "acc".into());
        assert_eq!(session.fail_submit(), Some(SubmitMode::Manual));

        assert_eq!(session.state(), ExamState::InProgress);
        assert_eq!(session.selection(), &before);
        assert_eq!(session.remaining_secs(), 299);
        assert!(session.result().is_none());
    }

    #[test]
    fn answers_are_frozen_once_time_runs_out() {
        let mut session = ExamSession::new(2);
        session.load(build_quiz(), fixed_now());
        session.select_answer("a".into(), "a1".into());
        session.tick();
        assert_eq!(session.tick(), TickOutcome::Expired);

        assert!(!session.select_answer("a".into(), "a2".into()));
        assert!(!session.clear_answer(&"a".into()));
        assert_eq!(session.selection().get(&"a".into()), Some(&AnswerId::new("a1")));
    }

    #[test]
    fn failed_auto_submit_expires_again_on_next_tick() {
        let mut session = ExamSession::new(1);
        session.load(build_quiz(), fixed_now());
        assert_eq!(session.tick(), TickOutcome::Expired);
        session.begin_submit(SubmitMode::Auto, "acc".into());
        assert_eq!(session.fail_submit(), Some(SubmitMode::Auto));

        assert_eq!(session.state(), ExamState::InProgress);
        assert!(!session.is_expired());
        assert_eq!(session.tick(), TickOutcome::Expired);
        assert_eq!(session.tick(), TickOutcome::Ignored);
        assert_eq!(session.remaining_secs(), 0);
    }

    #[test]
    fn release_expiry_needs_a_spent_clock() {
        let mut session = in_progress();
        assert!(!session.release_expiry());
        assert_eq!(session.tick(), TickOutcome::Running { remaining: 299 });
    }

    #[test]
    fn complete_then_reset_starts_fresh() {
        let mut session = in_progress();
        session.select_answer("a".into(), "a2".into());
        session.tick();
        session.begin_submit(SubmitMode::Auto, "acc".into());
        assert_eq!(
            session.complete_submit(result(), fixed_now()),
            Some(SubmitMode::Auto)
        );
        assert_eq!(session.state(), ExamState::Completed);
        assert_eq!(session.result(), Some(&result()));
        assert!(session.fail_submit().is_none());

        assert!(session.reset(fixed_now()));
        assert_eq!(session.state(), ExamState::InProgress);
        assert!(session.result().is_none());
        assert!(session.selection().is_empty());
        assert_eq!(session.remaining_secs(), 300);
        assert_eq!(session.attempts(), 0);
    }

    #[test]
    fn reset_is_refused_mid_submission() {
        let mut session = in_progress();
        session.begin_submit(SubmitMode::Manual, "acc".into());
        assert!(!session.reset(fixed_now()));
        assert_eq!(session.state(), ExamState::Submitting);
    }

    #[test]
    fn progress_snapshot() {
        let mut session = in_progress();
        session.select_answer("a".into(), "a1".into());
        session.tick();
        let progress = session.progress();
        assert_eq!(progress.total_questions, 2);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.unanswered(), 1);
        assert_eq!(progress.remaining_secs, 299);
        assert_eq!(progress.state, ExamState::InProgress);
    }
}
