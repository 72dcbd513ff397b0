use super::session::ExamState;

/// Aggregated view of an attempt, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamProgress {
    pub total_questions: usize,
    pub answered: usize,
    pub remaining_secs: u32,
    pub state: ExamState,
}

impl ExamProgress {
    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total_questions.saturating_sub(self.answered)
    }

    /// Remaining time as `m:ss`.
    #[must_use]
    pub fn countdown(&self) -> String {
        format!("{}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }
}
