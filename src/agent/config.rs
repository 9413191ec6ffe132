use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::agent::error::{invalid_parameter, invalid_range, AgentResult};

const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_MAX_EVENT_AGE: Duration = Duration::from_secs(9 * 60);
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// Configuration for one monitoring agent.
///
/// The application name and collector URL are mandatory; everything else has
/// a documented default and can be adjusted through the `with_*` builders.
/// The URL scheme selects HTTP or HTTPS transport.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    application_name: String,
    server_url: String,
    allow_any_cert: bool,
    certificate_path: Option<PathBuf>,
    monitor_cookie: Option<String>,
    flush_interval: Duration,
    max_event_age: Duration,
    send_timeout: Duration,
    buffer_capacity: usize,
    report_errors: bool,
    crash_dir: Option<PathBuf>,
}

impl AgentConfig {
    pub fn new(application_name: impl Into<String>, server_url: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            server_url: server_url.into(),
            allow_any_cert: false,
            certificate_path: None,
            monitor_cookie: None,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_event_age: DEFAULT_MAX_EVENT_AGE,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            report_errors: true,
            crash_dir: None,
        }
    }

    /// Accept any certificate for HTTPS communication. Only evaluated when
    /// the server URL uses the https scheme.
    pub fn with_allow_any_cert(mut self, allow: bool) -> Self {
        self.allow_any_cert = allow;
        self
    }

    /// Path to a DER-encoded certificate used as an additional trust anchor,
    /// for collectors behind self-signed certificates.
    pub fn with_certificate_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.certificate_path = Some(path.into());
        self
    }

    /// Value for the `Cookie` header on every transmission to the collector.
    pub fn with_monitor_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.monitor_cookie = Some(cookie.into());
        self
    }

    /// Wake interval of the transmission scheduler.
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Maximum age of the oldest buffered event before a send is forced.
    pub fn with_max_event_age(mut self, age: Duration) -> Self {
        self.max_event_age = age;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Capacity of the event buffer. When full, the oldest entry is dropped.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Switch error and exception reporting off. Report calls then return
    /// [`StatusCode::ReportErrorOff`](crate::agent::StatusCode::ReportErrorOff).
    pub fn with_report_errors(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    /// Directory for durable crash records. Defaults to the system temp dir.
    pub fn with_crash_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.crash_dir = Some(dir.into());
        self
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub(crate) fn allow_any_cert(&self) -> bool {
        self.allow_any_cert
    }

    pub(crate) fn certificate_path(&self) -> Option<&Path> {
        self.certificate_path.as_deref()
    }

    pub(crate) fn monitor_cookie(&self) -> Option<&str> {
        self.monitor_cookie.as_deref()
    }

    pub(crate) fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    pub(crate) fn max_event_age(&self) -> Duration {
        self.max_event_age
    }

    pub(crate) fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    pub(crate) fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    /// Buffer fill level at which the scheduler sends without waiting for
    /// the staleness ceiling.
    pub(crate) fn high_water_mark(&self) -> usize {
        (self.buffer_capacity - self.buffer_capacity / 4).max(1)
    }

    pub(crate) fn report_errors(&self) -> bool {
        self.report_errors
    }

    pub(crate) fn crash_dir(&self) -> Option<&Path> {
        self.crash_dir.as_deref()
    }

    pub(crate) fn validate(&self) -> AgentResult<()> {
        if self.application_name.trim().is_empty() {
            return Err(invalid_parameter("application name must not be empty"));
        }
        if self.server_url.trim().is_empty() {
            return Err(invalid_parameter("server URL must not be empty"));
        }
        let url = Url::parse(&self.server_url)
            .map_err(|err| invalid_parameter(format!("server URL is not valid: {err}")))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid_parameter(format!(
                "server URL scheme '{}' is not supported",
                url.scheme()
            )));
        }
        if self.buffer_capacity == 0 {
            return Err(invalid_range("buffer capacity must be at least 1"));
        }
        if self.flush_interval.is_zero() {
            return Err(invalid_range("flush interval must not be zero"));
        }
        if self.max_event_age.is_zero() {
            return Err(invalid_range("max event age must not be zero"));
        }
        Ok(())
    }
}
