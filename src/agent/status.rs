use std::fmt::{Display, Formatter};

/// Return code of the public monitoring operations.
///
/// Positive values denote informational or success states, negative values
/// denote error conditions. The numeric values are part of the collector
/// contract and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StatusCode {
    /// Monitoring is not enabled or cannot capture data.
    Off = 1,
    /// Monitoring is enabled.
    On = 2,
    /// Crash reporting could not be installed.
    CrashReportingUnavailable = 4,
    /// Crash reporting is installed.
    CrashReportingAvailable = 5,
    /// The SDK has not been started, or has been shut down.
    NotInitialized = -1,
    /// A parameter value is outside of the permitted range.
    InvalidRange = -2,
    /// An internal error occurred.
    InternalError = -3,
    /// No matching open action exists for this operation.
    ActionNotFound = -4,
    /// An empty or otherwise unusable parameter was supplied.
    InvalidParameter = -5,
    /// The action has already been closed via leave.
    ActionEnded = -6,
    /// Error reporting has been switched off by configuration.
    ReportErrorOff = -8,
    /// A name or value exceeded the maximum length and was truncated.
    TruncatedEventName = -9,
    /// A pending crash report could not be parsed.
    CrashReportInvalid = -10,
}

impl StatusCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Negative codes are errors; everything else is informational.
    pub fn is_error(self) -> bool {
        (self as i32) < 0
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::Off => "off",
            StatusCode::On => "on",
            StatusCode::CrashReportingUnavailable => "crash-reporting-unavailable",
            StatusCode::CrashReportingAvailable => "crash-reporting-available",
            StatusCode::NotInitialized => "not-initialized",
            StatusCode::InvalidRange => "invalid-range",
            StatusCode::InternalError => "internal-error",
            StatusCode::ActionNotFound => "action-not-found",
            StatusCode::InvalidParameter => "invalid-parameter",
            StatusCode::ActionEnded => "action-ended",
            StatusCode::ReportErrorOff => "report-error-off",
            StatusCode::TruncatedEventName => "truncated-event-name",
            StatusCode::CrashReportInvalid => "crash-report-invalid",
        }
    }
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
