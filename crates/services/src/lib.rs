#![forbid(unsafe_code)]

pub mod config;
pub mod confirm;
pub mod error;
pub mod scheduler;
pub mod sessions;

pub use logisim_core::Clock;

pub use config::ExamConfig;
pub use confirm::{FixedConfirmation, SubmitConfirmation};
pub use error::SessionError;
pub use scheduler::{ManualScheduler, TickCallback, TickHandle, TickScheduler, TokioScheduler};
pub use sessions::{
    ExamCommand, ExamNotice, ExamProgress, ExamRunner, ExamService, ExamSession, ExamState,
    PendingSubmission, SubmitMode, SubmitOutcome, TickOutcome,
};
