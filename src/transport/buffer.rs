use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::action::ClosedAction;
use crate::agent::error::ErrorSlot;
use crate::agent::StatusCode;
use crate::crash::CrashRecord;
use crate::web_request::WebRequestRecord;

/// One completed unit of monitoring data awaiting transmission.
#[derive(Clone, Debug)]
pub(crate) enum MonitoringEvent {
    /// A closed action subtree (a whole PurePath).
    ActionTree(ClosedAction),
    /// A web-request timing whose action closed before the response landed.
    WebRequest(WebRequestRecord),
    /// A crash record recovered from a previous process run.
    Crash(CrashRecord),
}

#[derive(Clone, Debug)]
pub(crate) struct BufferEntry {
    pub enqueued_at: Instant,
    pub event: MonitoringEvent,
}

/// Bounded, thread-safe FIFO of events awaiting transmission.
///
/// `enqueue` never blocks: when the buffer is full the oldest entry is
/// dropped and an internal error recorded; buffer-full is recoverable, not
/// fatal. Entries removed by `drain_all` are never re-offered, giving
/// at-most-once delivery per entry.
pub(crate) struct EventBuffer {
    capacity: usize,
    entries: Mutex<VecDeque<BufferEntry>>,
    errors: ErrorSlot,
}

impl EventBuffer {
    pub fn new(capacity: usize, errors: ErrorSlot) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            errors,
        }
    }

    pub fn enqueue(&self, event: MonitoringEvent) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= self.capacity {
            entries.pop_front();
            self.errors.record(
                StatusCode::InternalError,
                "event buffer full, oldest entry dropped",
            );
            log::warn!("event buffer at capacity ({}), dropping oldest entry", self.capacity);
        }
        entries.push_back(BufferEntry {
            enqueued_at: Instant::now(),
            event,
        });
    }

    /// Atomically removes and returns all entries in enqueue order.
    pub fn drain_all(&self) -> Vec<BufferEntry> {
        let mut entries = self.entries.lock().unwrap();
        entries.drain(..).collect()
    }

    /// Age of the oldest entry, used for the staleness check.
    pub fn oldest_age(&self) -> Option<Duration> {
        let entries = self.entries.lock().unwrap();
        entries.front().map(|entry| entry.enqueued_at.elapsed())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn marker(tag: &str) -> MonitoringEvent {
        MonitoringEvent::WebRequest(WebRequestRecord {
            action_id: 0,
            tag: tag.to_string(),
            url: None,
            start_wall_ms: 0,
            duration_ms: 0,
            outcome: None,
        })
    }

    fn tag_of(entry: &BufferEntry) -> String {
        match &entry.event {
            MonitoringEvent::WebRequest(record) => record.tag.clone(),
            _ => panic!("unexpected event"),
        }
    }

    #[test]
    fn entries_drain_in_enqueue_order() {
        let buffer = EventBuffer::new(8, ErrorSlot::default());
        buffer.enqueue(marker("a"));
        buffer.enqueue(marker("b"));
        buffer.enqueue(marker("c"));

        let drained = buffer.drain_all();
        let tags: Vec<String> = drained.iter().map(tag_of).collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn overflow_drops_the_oldest_entry_and_records_an_error() {
        let errors = ErrorSlot::default();
        let buffer = EventBuffer::new(2, errors.clone());
        buffer.enqueue(marker("a"));
        buffer.enqueue(marker("b"));
        buffer.enqueue(marker("c"));

        assert_eq!(buffer.len(), 2);
        let tags: Vec<String> = buffer.drain_all().iter().map(tag_of).collect();
        assert_eq!(tags, vec!["b", "c"]);
        assert_eq!(errors.code(), StatusCode::InternalError.as_i32());
    }

    #[test]
    fn oldest_age_reflects_the_head_entry() {
        let buffer = EventBuffer::new(4, ErrorSlot::default());
        assert!(buffer.oldest_age().is_none());
        buffer.enqueue(marker("a"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(buffer.oldest_age().unwrap() >= Duration::from_millis(5));
    }

    #[test]
    fn concurrent_enqueues_and_drains_lose_nothing() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 100;

        let buffer = Arc::new(EventBuffer::new(THREADS * PER_THREAD, ErrorSlot::default()));
        let mut collected = Vec::new();

        let producers: Vec<_> = (0..THREADS)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                std::thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        buffer.enqueue(marker(&format!("{t}-{i}")));
                    }
                })
            })
            .collect();

        // Interleave drains with the producers.
        for _ in 0..20 {
            collected.extend(buffer.drain_all());
            std::thread::yield_now();
        }
        for producer in producers {
            producer.join().unwrap();
        }
        collected.extend(buffer.drain_all());

        let mut tags: Vec<String> = collected.iter().map(tag_of).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), THREADS * PER_THREAD);
    }
}
