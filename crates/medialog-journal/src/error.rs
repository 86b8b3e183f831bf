use medialog_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("invalid period `{0}` (expected YYYY-MM)")]
    InvalidPeriod(String),
    #[error("invalid day `{0}`")]
    InvalidDay(String),
    #[error("day {day} is not in period {period}")]
    DayOutsidePeriod { day: String, period: String },
    #[error("invalid timestamp `{0}`")]
    InvalidTimestamp(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl JournalError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, JournalError::Store(e) if e.is_unauthorized())
    }
}
