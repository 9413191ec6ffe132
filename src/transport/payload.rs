use chrono::Utc;
use serde::Serialize;

use crate::action::{Attachment, AttachmentValue, ClosedAction};
use crate::crash::CrashRecord;
use crate::transport::buffer::{BufferEntry, MonitoringEvent};
use crate::web_request::WebRequestRecord;

/// One serialized transmission to the collector.
#[derive(Debug, Serialize)]
pub(crate) struct EventBatch {
    application: String,
    sdk_version: &'static str,
    session_id: String,
    sent_at_ms: i64,
    events: Vec<WireEvent>,
}

impl EventBatch {
    pub fn new(application: &str, session_id: String, entries: &[BufferEntry]) -> Self {
        Self {
            application: application.to_string(),
            sdk_version: env!("CARGO_PKG_VERSION"),
            session_id,
            sent_at_ms: Utc::now().timestamp_millis(),
            events: entries
                .iter()
                .map(|entry| WireEvent::from(&entry.event))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WireEvent {
    Action(WireAction),
    WebRequest(WireWebRequest),
    Crash(WireCrash),
}

impl From<&MonitoringEvent> for WireEvent {
    fn from(event: &MonitoringEvent) -> Self {
        match event {
            MonitoringEvent::ActionTree(tree) => WireEvent::Action(WireAction::from(tree)),
            MonitoringEvent::WebRequest(record) => {
                WireEvent::WebRequest(WireWebRequest::from(record))
            }
            MonitoringEvent::Crash(record) => WireEvent::Crash(WireCrash::from(record)),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireAction {
    id: u64,
    name: String,
    start_ms: i64,
    duration_ms: u64,
    attachments: Vec<WireAttachment>,
    children: Vec<WireAction>,
}

impl From<&ClosedAction> for WireAction {
    fn from(action: &ClosedAction) -> Self {
        Self {
            id: action.id,
            name: action.name.clone(),
            start_ms: action.start_wall_ms,
            duration_ms: duration_ms(action.duration),
            attachments: action.attachments.iter().map(WireAttachment::from).collect(),
            children: action.children.iter().map(WireAction::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireAttachment {
    seq: u64,
    name: String,
    recorded_at_ms: i64,
    #[serde(flatten)]
    value: WireAttachmentValue,
}

impl From<&Attachment> for WireAttachment {
    fn from(attachment: &Attachment) -> Self {
        Self {
            seq: attachment.seq,
            name: attachment.name.clone(),
            recorded_at_ms: attachment.recorded_at_ms,
            value: WireAttachmentValue::from(&attachment.value),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireAttachmentValue {
    Event,
    IntValue { value: i64 },
    DoubleValue { value: f64 },
    StringValue { value: String },
    Error { code: i32 },
    Exception { message: String, stack: Option<String> },
    WebRequest(WireWebRequest),
    VisitEnd,
}

impl From<&AttachmentValue> for WireAttachmentValue {
    fn from(value: &AttachmentValue) -> Self {
        match value {
            AttachmentValue::Event => WireAttachmentValue::Event,
            AttachmentValue::IntValue(value) => WireAttachmentValue::IntValue { value: *value },
            AttachmentValue::DoubleValue(value) => {
                WireAttachmentValue::DoubleValue { value: *value }
            }
            AttachmentValue::StringValue(value) => WireAttachmentValue::StringValue {
                value: value.clone(),
            },
            AttachmentValue::Error { code } => WireAttachmentValue::Error { code: *code },
            AttachmentValue::Exception { message, stack } => WireAttachmentValue::Exception {
                message: message.clone(),
                stack: stack.clone(),
            },
            AttachmentValue::WebRequest(record) => {
                WireAttachmentValue::WebRequest(WireWebRequest::from(record))
            }
            AttachmentValue::VisitEnd => WireAttachmentValue::VisitEnd,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireWebRequest {
    action_id: u64,
    tag: String,
    url: Option<String>,
    start_ms: i64,
    duration_ms: u64,
    outcome: Option<String>,
}

impl From<&WebRequestRecord> for WireWebRequest {
    fn from(record: &WebRequestRecord) -> Self {
        Self {
            action_id: record.action_id,
            tag: record.tag.clone(),
            url: record.url.clone(),
            start_ms: record.start_wall_ms,
            duration_ms: record.duration_ms,
            outcome: record.outcome.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireCrash {
    application: String,
    name: String,
    reason: String,
    stack: Option<String>,
    occurred_at_ms: i64,
}

impl From<&CrashRecord> for WireCrash {
    fn from(record: &CrashRecord) -> Self {
        Self {
            application: record.application.clone(),
            name: record.name.clone(),
            reason: record.reason.clone(),
            stack: record.stack.clone(),
            occurred_at_ms: record.occurred_at_ms,
        }
    }
}

fn duration_ms(duration: std::time::Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}
