//! The monitoring agent: configuration, lifecycle, status codes, and the
//! last-error slot.

mod api;
pub(crate) mod config;
pub(crate) mod error;
mod status;
pub(crate) mod tag;

#[doc(inline)]
pub use api::{
    enable_crash_reporting, flush_events, last_error_code, last_error_msg, set_monitor_cookie,
    shutdown, startup, status, Agent,
};
pub(crate) use api::installed;
#[doc(inline)]
pub use config::AgentConfig;
#[doc(inline)]
pub use error::{
    internal_error, invalid_parameter, invalid_range, not_initialized, AgentError, AgentResult,
};
#[doc(inline)]
pub use status::StatusCode;
