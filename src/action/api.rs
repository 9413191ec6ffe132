use crate::agent::{self, AgentResult, StatusCode};
use crate::agent::error::not_initialized;

/// Opaque handle to an action owned by the process-wide agent.
///
/// Handles are plain ids, freely copyable and sendable across threads; all
/// action state lives inside the agent. Operations on a handle whose action
/// already closed fail with [`StatusCode::ActionEnded`], and every method
/// returns [`StatusCode::NotInitialized`] when the SDK is not started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActionHandle {
    id: u64,
}

/// Starts a timed root action on the process-wide agent.
pub fn enter_action(name: &str) -> AgentResult<ActionHandle> {
    match agent::installed() {
        Some(agent) => agent.enter_action(name, None),
        None => Err(not_initialized()),
    }
}

/// Reports an error that is not tied to any action. The error is wrapped in
/// a single-node tree and enqueued immediately.
pub fn report_error(name: &str, code: i32) -> StatusCode {
    with_agent(|agent| agent.report_error(None, name, code))
}

/// Reports a caught exception that is not tied to any action.
pub fn report_exception(name: &str, message: &str, stack: Option<&str>) -> StatusCode {
    with_agent(|agent| agent.report_exception(None, name, message, stack))
}

/// Ends the current visit. All subsequent events belong to a new session.
pub fn end_visit() -> StatusCode {
    with_agent(|agent| agent.end_visit(None))
}

impl ActionHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self { id }
    }

    pub(crate) fn id(self) -> u64 {
        self.id
    }

    /// Starts a child action nested under this one.
    pub fn enter_child(self, name: &str) -> AgentResult<ActionHandle> {
        match agent::installed() {
            Some(agent) => agent.enter_action(name, Some(self)),
            None => Err(not_initialized()),
        }
    }

    /// Closes the action. When this is a root action, its whole subtree is
    /// handed to the transmission buffer.
    pub fn leave(self) -> StatusCode {
        with_agent(|agent| agent.leave_action(self))
    }

    pub fn report_event(self, name: &str) -> StatusCode {
        with_agent(|agent| agent.report_event(self, name))
    }

    pub fn report_value_int(self, name: &str, value: i64) -> StatusCode {
        with_agent(|agent| agent.report_value_int(self, name, value))
    }

    pub fn report_value_double(self, name: &str, value: f64) -> StatusCode {
        with_agent(|agent| agent.report_value_double(self, name, value))
    }

    pub fn report_value_string(self, name: &str, value: &str) -> StatusCode {
        with_agent(|agent| agent.report_value_string(self, name, value))
    }

    pub fn report_error(self, name: &str, code: i32) -> StatusCode {
        with_agent(|agent| agent.report_error(Some(self), name, code))
    }

    pub fn report_exception(self, name: &str, message: &str, stack: Option<&str>) -> StatusCode {
        with_agent(|agent| agent.report_exception(Some(self), name, message, stack))
    }

    /// Ends the visit with this action as the carrier of the visit-end
    /// marker.
    pub fn end_visit(self) -> StatusCode {
        with_agent(|agent| agent.end_visit(Some(self)))
    }
}

fn with_agent(f: impl FnOnce(&crate::agent::Agent) -> StatusCode) -> StatusCode {
    match agent::installed() {
        Some(agent) => f(&agent),
        None => StatusCode::NotInitialized,
    }
}
