use std::sync::Arc;

use gateway::GatewayError;
use logisim_core::model::{AnswerId, QuestionId, Quiz, QuizId, SubmissionResult};
use tokio::sync::mpsc;

use super::progress::ExamProgress;
use super::service::{ExamService, SubmitOutcome};
use super::session::{ExamSession, ExamState, SubmitMode, TickOutcome};
use crate::error::SessionError;
use crate::scheduler::{TickHandle, TickScheduler};

/// Requests coming from the user interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamCommand {
    Select {
        question: QuestionId,
        answer: AnswerId,
    },
    Clear {
        question: QuestionId,
    },
    Submit,
    Reset,
    Status,
    Quit,
}

/// Things the user interface should show.
#[derive(Debug, Clone, PartialEq)]
pub enum ExamNotice {
    Loaded(Quiz),
    Started(ExamProgress),
    Tick { remaining: u32 },
    Expired,
    Submitting { mode: SubmitMode },
    Submitted {
        mode: SubmitMode,
        result: SubmissionResult,
        message: String,
    },
    SubmitFailed { mode: SubmitMode, error: SessionError },
    SubmitDeclined,
    Reset(ExamProgress),
    Status(ExamProgress),
}

enum RunnerEvent {
    Tick,
    Settled {
        mode: SubmitMode,
        outcome: Result<SubmissionResult, GatewayError>,
    },
}

/// Event loop that owns one `ExamSession`.
///
/// Ticks from the scheduler, commands from the UI, and the results of
/// submissions running on their own task all arrive here, one at a time, so
/// ticks keep flowing while a submission is in flight. The session's
/// `Submitting` state then drops the second of any two racing submits.
pub struct ExamRunner {
    service: Arc<ExamService>,
    scheduler: Arc<dyn TickScheduler>,
    session: ExamSession,
    ticker: Option<TickHandle>,
    events_tx: mpsc::UnboundedSender<RunnerEvent>,
    events_rx: mpsc::UnboundedReceiver<RunnerEvent>,
    notices: mpsc::UnboundedSender<ExamNotice>,
}

impl ExamRunner {
    #[must_use]
    pub fn new(
        service: Arc<ExamService>,
        scheduler: Arc<dyn TickScheduler>,
        notices: mpsc::UnboundedSender<ExamNotice>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = service.new_session();
        Self {
            service,
            scheduler,
            session,
            ticker: None,
            events_tx,
            events_rx,
            notices,
        }
    }

    #[must_use]
    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    /// Load `quiz_id` and process events until `Quit` or the command channel closes.
    ///
    /// A submission still in flight at that point is awaited, so the returned
    /// session is never left `Submitting`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` if the quiz cannot be fetched.
    pub async fn run(
        mut self,
        quiz_id: QuizId,
        mut commands: mpsc::UnboundedReceiver<ExamCommand>,
    ) -> Result<ExamSession, SessionError> {
        self.service.start(&mut self.session, &quiz_id).await?;
        if let Some(quiz) = self.session.quiz() {
            self.notify(ExamNotice::Loaded(quiz.clone()));
        }
        self.arm_ticker();
        self.notify(ExamNotice::Started(self.session.progress()));

        loop {
            tokio::select! {
                biased;
                Some(event) = self.events_rx.recv() => self.on_event(event),
                command = commands.recv() => match command {
                    None | Some(ExamCommand::Quit) => break,
                    Some(command) => self.on_command(command).await,
                },
            }
        }

        self.settle_in_flight().await;
        self.disarm_ticker();
        Ok(self.session)
    }

    /// Wait for a submission that is still with the sink so the returned
    /// session reflects what the backend decided.
    async fn settle_in_flight(&mut self) {
        while self.session.state() == ExamState::Submitting {
            match self.events_rx.recv().await {
                Some(event) => self.on_event(event),
                None => break,
            }
        }
    }

    fn on_event(&mut self, event: RunnerEvent) {
        match event {
            RunnerEvent::Tick => match self.session.tick() {
                TickOutcome::Running { remaining } => self.notify(ExamNotice::Tick { remaining }),
                TickOutcome::Expired => {
                    self.notify(ExamNotice::Tick { remaining: 0 });
                    self.notify(ExamNotice::Expired);
                    self.begin_submit(SubmitMode::Auto);
                }
                TickOutcome::Ignored => {}
            },
            RunnerEvent::Settled { mode, outcome } => {
                match self.service.finish_submission(&mut self.session, mode, outcome) {
                    Ok(SubmitOutcome::Submitted { mode, result }) => {
                        let message = SubmitOutcome::Submitted {
                            mode,
                            result: result.clone(),
                        }
                        .notice()
                        .unwrap_or_default();
                        self.notify(ExamNotice::Submitted {
                            mode,
                            result,
                            message,
                        });
                    }
                    Ok(SubmitOutcome::Declined | SubmitOutcome::Ignored) => {}
                    Err(error) => {
                        self.notify(ExamNotice::SubmitFailed { mode, error });
                        // With the clock spent, the next tick retries the automatic submission.
                        self.arm_ticker();
                    }
                }
            }
        }
    }

    async fn on_command(&mut self, command: ExamCommand) {
        match command {
            ExamCommand::Select { question, answer } => {
                self.session.select_answer(question, answer);
            }
            ExamCommand::Clear { question } => {
                self.session.clear_answer(&question);
            }
            ExamCommand::Submit => {
                if !self.session.is_in_progress() {
                    log::debug!("submit dropped in state {:?}", self.session.state());
                    return;
                }
                // Ticks keep queueing while the prompt is open.
                if !self.service.confirm_manual(&self.session).await {
                    self.notify(ExamNotice::SubmitDeclined);
                    return;
                }
                self.begin_submit(SubmitMode::Manual);
            }
            ExamCommand::Reset => {
                if self.service.reset(&mut self.session) {
                    self.arm_ticker();
                    self.notify(ExamNotice::Reset(self.session.progress()));
                }
            }
            ExamCommand::Status => self.notify(ExamNotice::Status(self.session.progress())),
            ExamCommand::Quit => {}
        }
    }

    fn begin_submit(&mut self, mode: SubmitMode) {
        let pending = match self.service.prepare_submission(&mut self.session, mode) {
            Ok(Some(pending)) => pending,
            Ok(None) => return,
            Err(error) => {
                self.notify(ExamNotice::SubmitFailed { mode, error });
                return;
            }
        };

        self.disarm_ticker();
        self.notify(ExamNotice::Submitting { mode });

        let sink = self.service.sink();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = pending.send(sink.as_ref()).await;
            let _ = events.send(RunnerEvent::Settled {
                mode: pending.mode,
                outcome,
            });
        });
    }

    fn arm_ticker(&mut self) {
        self.disarm_ticker();
        let events = self.events_tx.clone();
        let handle = self.scheduler.schedule_repeating(
            self.service.config().tick_interval,
            Box::new(move || {
                let _ = events.send(RunnerEvent::Tick);
            }),
        );
        self.ticker = Some(handle);
    }

    fn disarm_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.cancel();
        }
    }

    fn notify(&self, notice: ExamNotice) {
        // A closed receiver just means nobody is watching.
        let _ = self.notices.send(notice);
    }
}
