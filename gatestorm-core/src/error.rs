use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("no scenarios to run")]
    NoScenarios,

    #[error("scenario `{0}`: `vus` must be a positive integer")]
    InvalidVus(String),

    #[error("scenario `{0}`: `iterations` must be a positive integer")]
    InvalidIterations(String),

    #[error("scenario `{0}`: `duration` must be positive")]
    InvalidDuration(String),

    #[error("wait time minimum {min:?} exceeds maximum {max:?}")]
    InvalidWaitTime { min: Duration, max: Duration },

    #[error("scenario `{0}` has no task with a positive weight")]
    EmptyTaskSet(String),

    #[error("duplicate scenario name `{0}`")]
    DuplicateScenario(String),
}

/// Failure raised by a single task invocation. Never terminates the virtual user.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Http(#[from] gatestorm_http::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TaskError {
    /// Stable label used as the `error_kind` metric tag.
    #[must_use]
    pub fn kind(&self) -> String {
        match self {
            Self::Http(err) => err.transport_error_kind().to_string(),
            Self::Json(_) => "json".to_string(),
            Self::Other(_) => "other".to_string(),
        }
    }
}

pub type TaskResult = std::result::Result<(), TaskError>;
