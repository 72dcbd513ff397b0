use async_trait::async_trait;

use crate::sessions::ExamProgress;

/// Asks the student to confirm a manual submission.
#[async_trait]
pub trait SubmitConfirmation: Send + Sync {
    /// Returns true to go ahead with the submission.
    async fn confirm(&self, progress: &ExamProgress) -> bool;
}

/// Always gives the same answer. Useful for headless runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmation(pub bool);

impl FixedConfirmation {
    #[must_use]
    pub fn accept() -> Self {
        Self(true)
    }

    #[must_use]
    pub fn decline() -> Self {
        Self(false)
    }
}

#[async_trait]
impl SubmitConfirmation for FixedConfirmation {
    async fn confirm(&self, _progress: &ExamProgress) -> bool {
        self.0
    }
}
