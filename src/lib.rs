//! rumkit is the core of a real user monitoring (RUM) and crash-reporting
//! SDK: a timed-action tracing engine that builds nested action trees, a
//! bounded event buffer drained by a background transmission scheduler, a
//! web-request correlator, and a panic-hook crash capture path.
//!
//! Application code drives the action tree builder (enter/leave actions,
//! report events, values, and errors). Closed action trees move into the
//! event buffer, which a single background task flushes to the configured
//! collector endpoint, either on demand or once the oldest entry exceeds the
//! staleness ceiling. Crash records are persisted durably at panic time and
//! picked up on the next startup.
//!
//! Public operations return a [`agent::StatusCode`] rather than panicking or
//! raising into host code; telemetry must never take the application down.

pub mod action;
pub mod agent;
pub mod crash;
pub mod platform;
pub(crate) mod transport;
pub mod web_request;

#[cfg(test)]
pub(crate) mod test_support;
