use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

use crate::agent::status::StatusCode;

/// Error returned by value-producing SDK operations.
///
/// Every error maps onto a [`StatusCode`] so callers that only care about
/// the documented integer contract can convert without losing information.
#[derive(Clone, Debug)]
pub struct AgentError {
    status: StatusCode,
    message: String,
}

impl AgentError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for AgentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl std::error::Error for AgentError {}

pub type AgentResult<T> = Result<T, AgentError>;

pub fn invalid_parameter(message: impl Into<String>) -> AgentError {
    AgentError::new(StatusCode::InvalidParameter, message)
}

pub fn invalid_range(message: impl Into<String>) -> AgentError {
    AgentError::new(StatusCode::InvalidRange, message)
}

pub fn internal_error(message: impl Into<String>) -> AgentError {
    AgentError::new(StatusCode::InternalError, message)
}

pub fn not_initialized() -> AgentError {
    AgentError::new(StatusCode::NotInitialized, "the SDK has not been started")
}

#[derive(Clone, Debug)]
pub(crate) struct LastError {
    pub status: StatusCode,
    pub message: String,
}

/// Single-slot record of the most recent internal failure.
///
/// Written by every component when something goes wrong internally and read
/// back through `last_error_code` / `last_error_msg`. Each new failure
/// overwrites the previous one; errors are not accumulated.
#[derive(Clone, Default)]
pub(crate) struct ErrorSlot {
    inner: Arc<Mutex<Option<LastError>>>,
}

impl ErrorSlot {
    pub fn record(&self, status: StatusCode, message: impl Into<String>) {
        let mut slot = self.inner.lock().unwrap();
        *slot = Some(LastError {
            status,
            message: message.into(),
        });
    }

    /// The most recent error code, or 0 when no error has been recorded.
    pub fn code(&self) -> i32 {
        self.inner
            .lock()
            .unwrap()
            .as_ref()
            .map(|err| err.status.as_i32())
            .unwrap_or(0)
    }

    pub fn message(&self) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .as_ref()
            .map(|err| err.message.clone())
    }
}
