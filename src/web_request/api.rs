use std::time::Instant;

use chrono::Utc;

use crate::agent::{self, Agent, StatusCode};

/// Name of the HTTP header carrying the correlation tag on outbound
/// requests. Add this header (with a value from
/// [`request_tag_value_for_url`]) to requests made outside the SDK so the
/// collector can nest them under the active action.
pub const REQUEST_TAG_HEADER: &str = "x-rumkit-tag";

const TAG_PREFIX: &str = "RK";
const TAG_VERSION: &str = "1";

/// Builds a correlation tag value: prefix, format version, session id,
/// owning action id, and a per-call serial.
pub(crate) fn format_tag(session_hex: &str, action_id: u64, serial: u64) -> String {
    format!("{TAG_PREFIX}_{TAG_VERSION}_{session_hex}_{action_id}_{serial}")
}

/// Extracts the owning action id from a tag value produced by
/// [`format_tag`]. Returns `None` for malformed or foreign tags.
pub(crate) fn parse_tag(tag: &str) -> Option<u64> {
    let mut parts = tag.split('_');
    if parts.next() != Some(TAG_PREFIX) || parts.next() != Some(TAG_VERSION) {
        return None;
    }
    let _session = parts.next()?;
    let action_id = parts.next()?.parse().ok()?;
    if parts.next().is_none() || parts.next().is_some() {
        return None;
    }
    Some(action_id)
}

/// Returns the correlation header value for a manually tagged web request,
/// or `None` when the SDK is not started or no action is open.
///
/// A fresh tag is generated on every call; the URL parameter is accepted for
/// parity with the documented contract but does not influence the value.
pub fn request_tag_value_for_url(url: Option<&str>) -> Option<String> {
    agent::installed()?.request_tag_value_for_url(url)
}

/// Completed timing of one tagged outbound request, as attached to an
/// action or enqueued standalone when the action closed before the
/// response arrived.
#[derive(Clone, Debug, PartialEq)]
pub struct WebRequestRecord {
    pub(crate) action_id: u64,
    pub(crate) tag: String,
    pub(crate) url: Option<String>,
    pub(crate) start_wall_ms: i64,
    pub(crate) duration_ms: u64,
    pub(crate) outcome: Option<String>,
}

/// Manual timing for one outbound web request.
///
/// Created from a tag obtained via [`request_tag_value_for_url`]; call
/// [`start`](WebRequestTiming::start) immediately before issuing the request
/// and [`stop`](WebRequestTiming::stop) once the response (or failure) is
/// known. Each timing object may be used exactly once.
#[derive(Debug)]
pub struct WebRequestTiming {
    agent: Agent,
    tag: String,
    url: Option<String>,
    action_id: u64,
    started: Option<(Instant, i64)>,
    finished: bool,
}

impl WebRequestTiming {
    pub(crate) fn new(agent: Agent, tag: String, url: Option<String>, action_id: u64) -> Self {
        Self {
            agent,
            tag,
            url,
            action_id,
            started: None,
            finished: false,
        }
    }

    /// Creates a timing object for a previously generated tag value.
    ///
    /// Returns `None` when the SDK is not started or the tag is malformed.
    pub fn for_tag(tag: &str, url: Option<&str>) -> Option<WebRequestTiming> {
        let agent = agent::installed()?;
        agent.web_request_timing(tag, url).ok()
    }

    /// Marks the moment the request goes on the wire.
    pub fn start(&mut self) -> StatusCode {
        if self.finished {
            return StatusCode::ActionEnded;
        }
        self.started = Some((Instant::now(), Utc::now().timestamp_millis()));
        StatusCode::On
    }

    /// Finishes the timing and records it against the owning action.
    ///
    /// `outcome` is the response status code of a successful request or an
    /// error code for a failed one. Calling stop a second time fails with
    /// [`StatusCode::ActionEnded`]; reuse of a timing object is forbidden.
    ///
    /// If the owning action has already been closed (request completion is
    /// asynchronous relative to UI actions), the record is still accepted
    /// and enqueued standalone, carrying the originating action id.
    pub fn stop(&mut self, outcome: Option<&str>) -> StatusCode {
        if self.finished {
            return StatusCode::ActionEnded;
        }
        let Some((started, start_wall_ms)) = self.started else {
            return StatusCode::InvalidParameter;
        };
        self.finished = true;
        let record = WebRequestRecord {
            action_id: self.action_id,
            tag: self.tag.clone(),
            url: self.url.clone(),
            start_wall_ms,
            duration_ms: started.elapsed().as_millis().min(u64::MAX as u128) as u64,
            outcome: outcome.map(str::to_string),
        };
        self.agent.record_web_request(record);
        StatusCode::On
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips_the_action_id() {
        let tag = format_tag("1f2e3d", 42, 7);
        assert_eq!(tag, "RK_1_1f2e3d_42_7");
        assert_eq!(parse_tag(&tag), Some(42));
    }

    #[test]
    fn malformed_tags_are_rejected() {
        assert_eq!(parse_tag(""), None);
        assert_eq!(parse_tag("RK_1_abc"), None);
        assert_eq!(parse_tag("XX_1_abc_42_7"), None);
        assert_eq!(parse_tag("RK_2_abc_42_7"), None);
        assert_eq!(parse_tag("RK_1_abc_notanumber_7"), None);
        assert_eq!(parse_tag("RK_1_abc_42_7_extra"), None);
    }
}
