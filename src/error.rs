use thiserror::Error;

/// Errors surfaced by the scheduling core to its callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Invalid calendar configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid time format: '{0}' (expected HH:MM)")]
    InvalidTimeFormat(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("This time slot is no longer available")]
    SlotNoLongerAvailable,

    #[error("Invalid booking request: {0}")]
    InvalidRequest(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl SchedulingError {
    /// Stable machine-readable code, used by the HTTP layer and the CLI.
    pub fn code(&self) -> &'static str {
        match self {
            SchedulingError::InvalidConfig(_) => "invalid_config",
            SchedulingError::InvalidTimeFormat(_) => "invalid_time_format",
            SchedulingError::NotFound(_) => "not_found",
            SchedulingError::SlotNoLongerAvailable => "slot_no_longer_available",
            SchedulingError::InvalidRequest(_) => "invalid_request",
            SchedulingError::Unavailable(_) => "unavailable",
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_transient(&self) -> bool {
        matches!(self, SchedulingError::Unavailable(_))
    }
}

/// Errors returned by the settings provider and the appointment store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Interval overlaps an existing appointment")]
    Conflict,

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store unreachable: {0}")]
    Unavailable(String),

    #[error("Store error: {0}")]
    Other(String),
}

impl From<StoreError> for SchedulingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => SchedulingError::SlotNoLongerAvailable,
            StoreError::NotFound(what) => SchedulingError::NotFound(what),
            StoreError::Unavailable(msg) | StoreError::Other(msg) => {
                SchedulingError::Unavailable(msg)
            }
        }
    }
}

/// Reminder enqueue failures. Logged by the coordinator, never propagated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Dispatcher unreachable: {0}")]
    Unavailable(String),

    #[error("Dispatcher rejected job: {0}")]
    Rejected(String),
}
