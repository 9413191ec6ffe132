//! Shared helpers for unit tests.

use std::sync::{Mutex, MutexGuard};

static GLOBAL_AGENT_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that install or tear down the process-wide agent.
pub(crate) fn global_agent_lock() -> MutexGuard<'static, ()> {
    GLOBAL_AGENT_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
