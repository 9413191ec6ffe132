use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::action::constants::{truncate, MAX_NAME_LENGTH, MAX_STRING_VALUE_LENGTH};
use crate::action::tree::{ActionTable, AttachmentValue, ClosedAction};
use crate::action::ActionHandle;
use crate::agent::config::AgentConfig;
use crate::agent::error::{invalid_parameter, AgentError, AgentResult, ErrorSlot};
use crate::agent::status::StatusCode;
use crate::agent::tag::TagGenerator;
use crate::crash::{self, CrashReportPolicy, CrashStore};
use crate::transport::buffer::{EventBuffer, MonitoringEvent};
use crate::transport::scheduler::Scheduler;
use crate::web_request::{self, WebRequestRecord, WebRequestTiming};

/// Upper bound on how long `shutdown` waits for the final flush.
const SHUTDOWN_FLUSH_WAIT: Duration = Duration::from_secs(2);

/// One monitoring agent: the process-wide context object owning the action
/// table, the event buffer, the transmission scheduler, and the last-error
/// slot.
///
/// Most applications use the global facade ([`startup`], [`shutdown`],
/// [`enter_action`](crate::action::enter_action), …), which installs a
/// single `Agent` for the process. Constructing an `Agent` directly is
/// useful for tests and for hosts that manage their own lifecycle.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    config: AgentConfig,
    tags: TagGenerator,
    errors: ErrorSlot,
    actions: Mutex<ActionTable>,
    buffer: Arc<EventBuffer>,
    scheduler: Scheduler,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("application", &self.inner.config.application_name())
            .field("server_url", &self.inner.config.server_url())
            .finish()
    }
}

impl Agent {
    /// Validates the configuration, spawns the transmission scheduler, and
    /// recovers a pending crash record from a previous run, if any.
    pub fn new(config: AgentConfig) -> AgentResult<Agent> {
        config.validate()?;
        let errors = ErrorSlot::default();
        let tags = TagGenerator::new();
        let buffer = Arc::new(EventBuffer::new(config.buffer_capacity(), errors.clone()));

        let store = CrashStore::for_application(config.crash_dir(), config.application_name());
        match store.take() {
            Ok(Some(record)) => buffer.enqueue(MonitoringEvent::Crash(record)),
            Ok(None) => {}
            Err(err) => errors.record(
                StatusCode::CrashReportInvalid,
                format!("pending crash report discarded: {err}"),
            ),
        }

        let scheduler = Scheduler::spawn(
            config.clone(),
            Arc::clone(&buffer),
            errors.clone(),
            tags.clone(),
        )?;

        Ok(Agent {
            inner: Arc::new(AgentInner {
                config,
                tags,
                errors,
                actions: Mutex::new(ActionTable::default()),
                buffer,
                scheduler,
            }),
        })
    }

    pub fn application_name(&self) -> &str {
        self.inner.config.application_name()
    }

    /// Starts a timed action. With a parent the new action extends that
    /// PurePath; without one it becomes the root of a new tree.
    pub fn enter_action(
        &self,
        name: &str,
        parent: Option<ActionHandle>,
    ) -> AgentResult<ActionHandle> {
        if name.trim().is_empty() {
            return Err(invalid_parameter("action name must not be empty"));
        }
        let (name, truncated) = truncate(name, MAX_NAME_LENGTH);
        let id = self.inner.tags.next_id();
        let result = {
            let mut actions = self.inner.actions.lock().unwrap();
            actions.enter(id, name, parent.map(|p| p.id()))
        };
        match result {
            Ok(()) => {
                if truncated {
                    self.record_truncation();
                }
                Ok(ActionHandle::new(id))
            }
            Err(err) => Err(AgentError::new(err.status(), "parent action is not open")),
        }
    }

    /// Closes the action and computes its interval. Open descendants are
    /// force-closed first, deepest-first, so the transmitted tree never
    /// contains an open node. When a root action closes, the whole subtree
    /// moves into the event buffer.
    pub fn leave_action(&self, action: ActionHandle) -> StatusCode {
        let result = {
            let mut actions = self.inner.actions.lock().unwrap();
            actions.close(action.id(), Instant::now())
        };
        match result {
            Ok(Some(tree)) => {
                self.inner.buffer.enqueue(MonitoringEvent::ActionTree(tree));
                StatusCode::On
            }
            Ok(None) => StatusCode::On,
            Err(err) => err.status(),
        }
    }

    /// Records a named event on an open action.
    pub fn report_event(&self, action: ActionHandle, name: &str) -> StatusCode {
        let (name, truncated) = match self.prepared_name(name) {
            Ok(prepared) => prepared,
            Err(status) => return status,
        };
        self.deliver(Some(action), name, AttachmentValue::Event, truncated)
    }

    /// Records a named integer value on an open action.
    pub fn report_value_int(&self, action: ActionHandle, name: &str, value: i64) -> StatusCode {
        let (name, truncated) = match self.prepared_name(name) {
            Ok(prepared) => prepared,
            Err(status) => return status,
        };
        self.deliver(
            Some(action),
            name,
            AttachmentValue::IntValue(value),
            truncated,
        )
    }

    /// Records a named double value on an open action.
    pub fn report_value_double(&self, action: ActionHandle, name: &str, value: f64) -> StatusCode {
        let (name, truncated) = match self.prepared_name(name) {
            Ok(prepared) => prepared,
            Err(status) => return status,
        };
        self.deliver(
            Some(action),
            name,
            AttachmentValue::DoubleValue(value),
            truncated,
        )
    }

    /// Records a named string value on an open action. Oversized values are
    /// truncated like names, preserving partial data over total loss.
    pub fn report_value_string(&self, action: ActionHandle, name: &str, value: &str) -> StatusCode {
        let (name, name_truncated) = match self.prepared_name(name) {
            Ok(prepared) => prepared,
            Err(status) => return status,
        };
        let (value, value_truncated) = truncate(value, MAX_STRING_VALUE_LENGTH);
        self.deliver(
            Some(action),
            name,
            AttachmentValue::StringValue(value),
            name_truncated || value_truncated,
        )
    }

    /// Records an error code. Without an action the error wraps itself in a
    /// standalone single-node tree and is enqueued immediately.
    pub fn report_error(&self, action: Option<ActionHandle>, name: &str, code: i32) -> StatusCode {
        if !self.inner.config.report_errors() {
            return StatusCode::ReportErrorOff;
        }
        let (name, truncated) = match self.prepared_name(name) {
            Ok(prepared) => prepared,
            Err(status) => return status,
        };
        self.deliver(action, name, AttachmentValue::Error { code }, truncated)
    }

    /// Records a caught exception with an optional stack trace.
    pub fn report_exception(
        &self,
        action: Option<ActionHandle>,
        name: &str,
        message: &str,
        stack: Option<&str>,
    ) -> StatusCode {
        if !self.inner.config.report_errors() {
            return StatusCode::ReportErrorOff;
        }
        let (name, truncated) = match self.prepared_name(name) {
            Ok(prepared) => prepared,
            Err(status) => return status,
        };
        self.deliver(
            action,
            name,
            AttachmentValue::Exception {
                message: message.to_string(),
                stack: stack.map(str::to_string),
            },
            truncated,
        )
    }

    /// Ends the current visit. Subsequent events carry a fresh session id.
    pub fn end_visit(&self, action: Option<ActionHandle>) -> StatusCode {
        let status = self.deliver(
            action,
            "end of visit".to_string(),
            AttachmentValue::VisitEnd,
            false,
        );
        if !status.is_error() {
            self.inner.tags.roll_session();
        }
        status
    }

    /// Correlation tag for a manually tagged web request, or `None` when no
    /// action is open. A fresh tag is generated per call.
    pub fn request_tag_value_for_url(&self, _url: Option<&str>) -> Option<String> {
        let current = self.inner.actions.lock().unwrap().current()?;
        Some(web_request::format_tag(
            &self.inner.tags.session_hex(),
            current,
            self.inner.tags.next_id(),
        ))
    }

    /// Creates a manual timing object for a previously generated tag.
    pub fn web_request_timing(
        &self,
        tag: &str,
        url: Option<&str>,
    ) -> AgentResult<WebRequestTiming> {
        let action_id = web_request::parse_tag(tag)
            .ok_or_else(|| invalid_parameter("request tag is malformed"))?;
        Ok(WebRequestTiming::new(
            self.clone(),
            tag.to_string(),
            url.map(str::to_string),
            action_id,
        ))
    }

    /// Attaches a finished web-request timing to its owning action, or
    /// enqueues it standalone when the action already closed. Request
    /// completion is asynchronous relative to UI actions, so the late case
    /// is accepted rather than dropped.
    pub(crate) fn record_web_request(&self, record: WebRequestRecord) {
        let name = record
            .url
            .clone()
            .unwrap_or_else(|| record.tag.clone());
        let result = {
            let mut actions = self.inner.actions.lock().unwrap();
            actions.attach(
                record.action_id,
                name,
                AttachmentValue::WebRequest(record.clone()),
                Utc::now().timestamp_millis(),
            )
        };
        if result.is_err() {
            self.inner
                .buffer
                .enqueue(MonitoringEvent::WebRequest(record));
        }
    }

    /// Requests an asynchronous send of everything currently buffered,
    /// regardless of age, and returns immediately.
    pub fn flush(&self) -> StatusCode {
        if self.inner.scheduler.request_flush() {
            StatusCode::On
        } else {
            self.inner.errors.record(
                StatusCode::InternalError,
                "transmission scheduler is unavailable",
            );
            StatusCode::InternalError
        }
    }

    /// Installs or upgrades crash reporting for this agent's application.
    pub fn enable_crash_reporting(&self, policy: CrashReportPolicy) -> StatusCode {
        let store = CrashStore::for_application(
            self.inner.config.crash_dir(),
            self.inner.config.application_name(),
        );
        crash::install(
            policy,
            store,
            self.inner.config.application_name().to_string(),
        );
        StatusCode::CrashReportingAvailable
    }

    /// Stops the scheduler after one final forced flush, bounded by a short
    /// wait so shutdown cannot hang on a stalled network.
    pub fn shutdown(&self) -> StatusCode {
        self.inner.scheduler.stop(SHUTDOWN_FLUSH_WAIT);
        StatusCode::Off
    }

    pub fn last_error_code(&self) -> i32 {
        self.inner.errors.code()
    }

    pub fn last_error_msg(&self) -> Option<String> {
        self.inner.errors.message()
    }

    fn prepared_name(&self, name: &str) -> Result<(String, bool), StatusCode> {
        if name.trim().is_empty() {
            return Err(StatusCode::InvalidParameter);
        }
        Ok(truncate(name, MAX_NAME_LENGTH))
    }

    fn deliver(
        &self,
        action: Option<ActionHandle>,
        name: String,
        value: AttachmentValue,
        truncated: bool,
    ) -> StatusCode {
        let wall_ms = Utc::now().timestamp_millis();
        match action {
            Some(handle) => {
                let result = {
                    let mut actions = self.inner.actions.lock().unwrap();
                    actions.attach(handle.id(), name, value, wall_ms)
                };
                match result {
                    Ok(()) => self.report_outcome(truncated),
                    Err(err) => err.status(),
                }
            }
            None => {
                let id = self.inner.tags.next_id();
                let tree = ClosedAction::standalone(id, name, wall_ms, value);
                self.inner.buffer.enqueue(MonitoringEvent::ActionTree(tree));
                self.report_outcome(truncated)
            }
        }
    }

    fn report_outcome(&self, truncated: bool) -> StatusCode {
        if truncated {
            self.record_truncation();
            StatusCode::TruncatedEventName
        } else {
            StatusCode::On
        }
    }

    fn record_truncation(&self) {
        self.inner.errors.record(
            StatusCode::TruncatedEventName,
            "a name or value exceeded the maximum length and was truncated",
        );
    }

    #[cfg(test)]
    pub(crate) fn drain_buffer(&self) -> Vec<crate::transport::buffer::BufferEntry> {
        self.inner.buffer.drain_all()
    }
}

static INSTALLED: LazyLock<RwLock<Option<Agent>>> = LazyLock::new(|| RwLock::new(None));
static PENDING_COOKIE: Mutex<Option<String>> = Mutex::new(None);

/// The process-wide agent installed by [`startup`], if any.
pub(crate) fn installed() -> Option<Agent> {
    INSTALLED.read().unwrap().clone()
}

/// Initializes monitoring for this process.
///
/// Idempotent: repeated calls while an agent is running are ignored and
/// return the current status, so a second startup can never spawn a
/// duplicate transmission scheduler.
pub fn startup(config: AgentConfig) -> StatusCode {
    let mut slot = INSTALLED.write().unwrap();
    if slot.is_some() {
        return StatusCode::On;
    }
    let config = match PENDING_COOKIE.lock().unwrap().clone() {
        Some(cookie) if config.monitor_cookie().is_none() => config.with_monitor_cookie(cookie),
        _ => config,
    };
    match Agent::new(config) {
        Ok(agent) => {
            *slot = Some(agent);
            StatusCode::On
        }
        Err(err) => {
            log::warn!("monitoring startup failed: {err}");
            err.status()
        }
    }
}

/// Stops monitoring: flushes collected data (bounded wait), uninstalls the
/// crash hook, and releases the process-wide agent.
pub fn shutdown() -> StatusCode {
    let agent = INSTALLED.write().unwrap().take();
    match agent {
        Some(agent) => {
            let status = agent.shutdown();
            if crash::is_installed() {
                crash::uninstall();
            }
            status
        }
        None => StatusCode::NotInitialized,
    }
}

/// Current capture status: [`StatusCode::On`] while an agent is installed.
pub fn status() -> StatusCode {
    if installed().is_some() {
        StatusCode::On
    } else {
        StatusCode::Off
    }
}

/// Sends all collected events immediately, regardless of their age.
///
/// Collected events are normally sent in packages once the oldest entry
/// reaches the configured staleness ceiling; this forces a send now. The
/// actual transmission is asynchronous and this call returns immediately.
pub fn flush_events() -> StatusCode {
    match installed() {
        Some(agent) => agent.flush(),
        None => StatusCode::NotInitialized,
    }
}

/// Enables crash reporting for the running agent.
pub fn enable_crash_reporting(policy: CrashReportPolicy) -> StatusCode {
    match installed() {
        Some(agent) => agent.enable_crash_reporting(policy),
        None => StatusCode::NotInitialized,
    }
}

/// Sets the `Cookie` header value for collector transmissions, or removes
/// it with `None`. Must be called before [`startup`] to take effect for the
/// first transmission.
pub fn set_monitor_cookie(cookie: Option<String>) {
    *PENDING_COOKIE.lock().unwrap() = cookie;
}

/// Error code of the most recent internal failure, or 0 when none occurred.
pub fn last_error_code() -> i32 {
    installed().map(|agent| agent.last_error_code()).unwrap_or(0)
}

/// Message of the most recent internal failure, if any.
pub fn last_error_msg() -> Option<String> {
    installed().and_then(|agent| agent.last_error_msg())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crash::CrashRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unique_name(prefix: &str) -> String {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        format!("{prefix}-{}", COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    fn quiet_config(app: &str) -> AgentConfig {
        // Unroutable collector and a long tick keep the scheduler silent.
        AgentConfig::new(app, "http://127.0.0.1:9/events")
            .with_flush_interval(Duration::from_secs(300))
    }

    fn new_agent() -> Agent {
        Agent::new(quiet_config(&unique_name("agent"))).expect("agent")
    }

    fn only_tree(agent: &Agent) -> ClosedAction {
        let mut entries = agent.drain_buffer();
        assert_eq!(entries.len(), 1, "expected exactly one buffered entry");
        match entries.remove(0).event {
            MonitoringEvent::ActionTree(tree) => tree,
            other => panic!("expected an action tree, got {other:?}"),
        }
    }

    #[test]
    fn login_scenario_builds_a_two_node_tree() {
        let agent = new_agent();
        let login = agent.enter_action("Login", None).expect("enter Login");
        assert_eq!(agent.report_value_int(login, "retries", 3), StatusCode::On);
        let validate = agent
            .enter_action("Validate", Some(login))
            .expect("enter Validate");
        assert_eq!(agent.leave_action(validate), StatusCode::On);
        assert_eq!(agent.leave_action(login), StatusCode::On);

        let tree = only_tree(&agent);
        assert_eq!(tree.name(), "Login");
        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.children()[0].name(), "Validate");
        assert!(tree.duration() >= tree.children()[0].duration());
        assert_eq!(tree.attachments().len(), 1);
        assert_eq!(tree.attachments()[0].name(), "retries");
        assert_eq!(
            tree.attachments()[0].value(),
            &AttachmentValue::IntValue(3)
        );
    }

    #[test]
    fn leaving_twice_fails_and_does_not_double_enqueue() {
        let agent = new_agent();
        let action = agent.enter_action("once", None).expect("enter");
        assert_eq!(agent.leave_action(action), StatusCode::On);
        assert_eq!(agent.leave_action(action), StatusCode::ActionEnded);
        assert_eq!(agent.drain_buffer().len(), 1);
    }

    #[test]
    fn unknown_handles_report_action_not_found() {
        let agent = new_agent();
        let bogus = ActionHandle::new(987_654);
        assert_eq!(agent.leave_action(bogus), StatusCode::ActionNotFound);
        assert_eq!(agent.report_event(bogus, "x"), StatusCode::ActionNotFound);
    }

    #[test]
    fn attachments_after_close_are_rejected_and_not_recorded() {
        let agent = new_agent();
        let action = agent.enter_action("done", None).expect("enter");
        agent.leave_action(action);
        assert_eq!(
            agent.report_value_string(action, "late", "value"),
            StatusCode::ActionEnded
        );
        let tree = only_tree(&agent);
        assert!(tree.attachments().is_empty());
    }

    #[test]
    fn empty_names_are_invalid_parameters() {
        let agent = new_agent();
        assert!(agent.enter_action("  ", None).is_err());
        let action = agent.enter_action("ok", None).expect("enter");
        assert_eq!(agent.report_event(action, ""), StatusCode::InvalidParameter);
        assert_eq!(
            agent.report_error(Some(action), " ", 1),
            StatusCode::InvalidParameter
        );
    }

    #[test]
    fn oversized_names_are_truncated_deterministically() {
        let agent = new_agent();
        let action = agent.enter_action("truncation", None).expect("enter");
        let long = "n".repeat(MAX_NAME_LENGTH + 10);
        assert_eq!(
            agent.report_event(action, &long),
            StatusCode::TruncatedEventName
        );
        assert_eq!(
            agent.last_error_code(),
            StatusCode::TruncatedEventName.as_i32()
        );
        agent.leave_action(action);

        let tree = only_tree(&agent);
        let stored = tree.attachments()[0].name();
        assert_eq!(stored.chars().count(), MAX_NAME_LENGTH);
        assert_eq!(stored, &long[..MAX_NAME_LENGTH]);
    }

    #[test]
    fn standalone_errors_become_single_node_trees() {
        let agent = new_agent();
        assert_eq!(agent.report_error(None, "io failure", 7), StatusCode::On);
        let tree = only_tree(&agent);
        assert_eq!(tree.name(), "io failure");
        assert!(tree.children().is_empty());
        assert_eq!(
            tree.attachments()[0].value(),
            &AttachmentValue::Error { code: 7 }
        );
    }

    #[test]
    fn error_reporting_can_be_switched_off() {
        let config = quiet_config(&unique_name("quiet")).with_report_errors(false);
        let agent = Agent::new(config).expect("agent");
        assert_eq!(
            agent.report_error(None, "ignored", 1),
            StatusCode::ReportErrorOff
        );
        assert_eq!(
            agent.report_exception(None, "ignored", "message", None),
            StatusCode::ReportErrorOff
        );
        assert!(agent.drain_buffer().is_empty());
    }

    #[test]
    fn end_visit_rolls_the_session_id() {
        let agent = new_agent();
        let before = agent.inner.tags.session_hex();
        assert_eq!(agent.end_visit(None), StatusCode::On);
        let after = agent.inner.tags.session_hex();
        assert_ne!(before, after);
        let tree = only_tree(&agent);
        assert_eq!(tree.attachments()[0].value(), &AttachmentValue::VisitEnd);
    }

    #[test]
    fn tagged_web_request_lands_on_the_open_action() {
        let agent = new_agent();
        let action = agent.enter_action("Load", None).expect("enter");
        let tag = agent
            .request_tag_value_for_url(Some("https://api.example.com/data"))
            .expect("tag for open action");
        let mut timing = agent
            .web_request_timing(&tag, Some("https://api.example.com/data"))
            .expect("timing");
        assert_eq!(timing.start(), StatusCode::On);
        assert_eq!(timing.stop(Some("200")), StatusCode::On);
        assert_eq!(timing.stop(Some("200")), StatusCode::ActionEnded);
        agent.leave_action(action);

        let tree = only_tree(&agent);
        assert_eq!(tree.attachments().len(), 1);
        match tree.attachments()[0].value() {
            AttachmentValue::WebRequest(record) => {
                assert_eq!(record.outcome.as_deref(), Some("200"));
                assert_eq!(record.action_id, action.id());
            }
            other => panic!("expected a web request attachment, got {other:?}"),
        }
    }

    #[test]
    fn late_web_request_stop_is_enqueued_standalone() {
        let agent = new_agent();
        let action = agent.enter_action("Load", None).expect("enter");
        let tag = agent.request_tag_value_for_url(None).expect("tag");
        let mut timing = agent.web_request_timing(&tag, None).expect("timing");
        timing.start();
        agent.leave_action(action);
        assert_eq!(timing.stop(Some("504")), StatusCode::On);

        let entries = agent.drain_buffer();
        assert_eq!(entries.len(), 2);
        assert!(matches!(
            &entries[0].event,
            MonitoringEvent::ActionTree(tree) if tree.attachments().is_empty()
        ));
        assert!(matches!(
            &entries[1].event,
            MonitoringEvent::WebRequest(record) if record.action_id == action.id()
        ));
    }

    #[test]
    fn no_tag_without_an_open_action() {
        let agent = new_agent();
        assert!(agent.request_tag_value_for_url(None).is_none());
    }

    #[test]
    fn pending_crash_record_is_recovered_at_startup() {
        let dir = std::env::temp_dir().join(unique_name("rumkit-agent-crash"));
        let _ = std::fs::create_dir_all(&dir);
        let app = unique_name("crashed");
        let store = CrashStore::for_application(Some(&dir), &app);
        store
            .write(&CrashRecord {
                application: app.clone(),
                name: "panic".to_string(),
                reason: "boom".to_string(),
                stack: None,
                occurred_at_ms: 1,
            })
            .expect("persist record");

        let agent = Agent::new(quiet_config(&app).with_crash_dir(&dir)).expect("agent");
        let entries = agent.drain_buffer();
        assert_eq!(entries.len(), 1);
        assert!(matches!(
            &entries[0].event,
            MonitoringEvent::Crash(record) if record.reason == "boom"
        ));
        // The record is consumed; a second startup finds nothing.
        let again = Agent::new(quiet_config(&app).with_crash_dir(&dir)).expect("agent");
        assert!(again.drain_buffer().is_empty());
    }

    #[test]
    fn invalid_pending_crash_record_is_discarded_and_reported() {
        let dir = std::env::temp_dir().join(unique_name("rumkit-agent-badcrash"));
        let _ = std::fs::create_dir_all(&dir);
        let app = unique_name("corrupt");
        let store = CrashStore::for_application(Some(&dir), &app);
        std::fs::write(store.path(), "{ not json").expect("write garbage");

        let agent = Agent::new(quiet_config(&app).with_crash_dir(&dir)).expect("agent");
        assert!(agent.drain_buffer().is_empty());
        assert_eq!(
            agent.last_error_code(),
            StatusCode::CrashReportInvalid.as_i32()
        );
    }

    #[test]
    fn global_startup_is_idempotent() {
        let _guard = crate::test_support::global_agent_lock();

        let first = quiet_config(&unique_name("global-first"));
        let first_name = first.application_name().to_string();
        assert_eq!(startup(first), StatusCode::On);
        assert_eq!(status(), StatusCode::On);

        // The second startup is ignored; the original agent stays.
        assert_eq!(startup(quiet_config(&unique_name("global-second"))), StatusCode::On);
        assert_eq!(installed().unwrap().application_name(), first_name);

        assert_eq!(flush_events(), StatusCode::On);
        assert_eq!(shutdown(), StatusCode::Off);
        assert_eq!(status(), StatusCode::Off);
        assert_eq!(shutdown(), StatusCode::NotInitialized);
        assert_eq!(flush_events(), StatusCode::NotInitialized);
    }

    #[test]
    fn startup_rejects_invalid_configuration() {
        let _guard = crate::test_support::global_agent_lock();
        assert_eq!(
            startup(AgentConfig::new("", "http://collector.example.com")),
            StatusCode::InvalidParameter
        );
        assert_eq!(status(), StatusCode::Off);
    }

    #[test]
    fn crash_reporting_requires_startup() {
        let _guard = crate::test_support::global_agent_lock();
        assert_eq!(
            enable_crash_reporting(CrashReportPolicy::Minimal),
            StatusCode::NotInitialized
        );
    }
}
