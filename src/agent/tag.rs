use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::Rng;

/// Produces the unique identifiers used for actions and web-request tags.
///
/// The session id is random per visit and rolled when a visit ends; the
/// serial counter is monotonic for the lifetime of the agent, so action ids
/// are unique within one process run.
#[derive(Clone)]
pub(crate) struct TagGenerator {
    inner: Arc<TagInner>,
}

struct TagInner {
    session: AtomicU64,
    serial: AtomicU64,
}

impl TagGenerator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TagInner {
                session: AtomicU64::new(fresh_session_id()),
                serial: AtomicU64::new(0),
            }),
        }
    }

    /// Next unique id. Never returns 0.
    pub fn next_id(&self) -> u64 {
        self.inner.serial.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn session_id(&self) -> u64 {
        self.inner.session.load(Ordering::Relaxed)
    }

    pub fn session_hex(&self) -> String {
        format!("{:x}", self.session_id())
    }

    /// Starts a new visit: subsequent events carry a fresh session id.
    pub fn roll_session(&self) {
        self.inner
            .session
            .store(fresh_session_id(), Ordering::Relaxed);
    }
}

fn fresh_session_id() -> u64 {
    // 0 is reserved as "no session".
    rand::thread_rng().gen_range(1..u64::MAX)
}
