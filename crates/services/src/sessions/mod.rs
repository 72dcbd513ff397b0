mod progress;
mod runner;
mod service;
mod session;

// Public API of the exam session subsystem.
pub use crate::error::SessionError;
pub use progress::ExamProgress;
pub use runner::{ExamCommand, ExamNotice, ExamRunner};
pub use service::{ExamService, PendingSubmission, SubmitOutcome};
pub use session::{ExamSession, ExamState, SubmitMode, TickOutcome};
