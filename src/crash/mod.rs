//! Crash capture: a process-wide panic hook that serializes crash state to
//! durable storage, plus the pending-record pickup performed at startup.
//!
//! The hook runs in a restricted context during unwind, so it only formats
//! data that is already captured (panic message, location, and, in detailed
//! mode, a backtrace) and performs a single file write. The record is
//! converted into a crash event and transmitted on the *next* process run;
//! crash reporting is necessarily deferred to the following lifetime.

use std::backtrace::Backtrace;
use std::env;
use std::fmt::{Display, Formatter};
use std::fs;
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// How much context the installed hook captures.
///
/// The deprecated per-backend enable variants of the reference API collapse
/// into this single policy; delivery always goes through the collector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrashReportPolicy {
    /// Panic message and location only.
    Minimal,
    /// Message, location, and a captured backtrace.
    Detailed,
}

/// Serialized crash state written at panic time and recovered at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrashRecord {
    pub application: String,
    pub name: String,
    pub reason: String,
    pub stack: Option<String>,
    pub occurred_at_ms: i64,
}

#[derive(Debug)]
pub(crate) enum CrashStoreError {
    Io(std::io::Error),
    Invalid(serde_json::Error),
}

impl Display for CrashStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CrashStoreError::Io(err) => write!(f, "crash store I/O failure: {err}"),
            CrashStoreError::Invalid(err) => write!(f, "crash record is not parseable: {err}"),
        }
    }
}

impl std::error::Error for CrashStoreError {}

/// Durable single-record store, one file per application.
#[derive(Clone, Debug)]
pub(crate) struct CrashStore {
    path: PathBuf,
}

impl CrashStore {
    pub fn for_application(dir: Option<&Path>, application: &str) -> Self {
        let base = dir
            .map(Path::to_path_buf)
            .or_else(|| env::var("RUMKIT_CRASH_DIR").ok().map(PathBuf::from))
            .unwrap_or_else(env::temp_dir);
        let file: String = application
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        Self {
            path: base.join(format!("rumkit-crash-{file}.json")),
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, record: &CrashRecord) -> Result<(), CrashStoreError> {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let payload = serde_json::to_string(record).map_err(CrashStoreError::Invalid)?;
        fs::write(&self.path, payload).map_err(CrashStoreError::Io)
    }

    /// Removes and returns the pending record, if any. An unparseable file
    /// is deleted as well so it cannot wedge every subsequent startup.
    pub fn take(&self) -> Result<Option<CrashRecord>, CrashStoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).map_err(CrashStoreError::Io)?;
        let _ = fs::remove_file(&self.path);
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(CrashStoreError::Invalid)
    }
}

const UNINSTALLED: u8 = 0;
const MINIMAL: u8 = 1;
const DETAILED: u8 = 2;

static STATE: AtomicU8 = AtomicU8::new(UNINSTALLED);
static CONTEXT: Mutex<Option<HookContext>> = Mutex::new(None);
#[allow(clippy::type_complexity)]
static PREVIOUS: Mutex<Option<Box<dyn Fn(&PanicHookInfo<'_>) + Send + Sync>>> = Mutex::new(None);

struct HookContext {
    store: CrashStore,
    application: String,
    detailed: bool,
}

/// Installs (or upgrades) the process-wide panic hook.
///
/// The previously installed hook keeps running after ours, so host-side
/// panic handling is preserved.
pub(crate) fn install(policy: CrashReportPolicy, store: CrashStore, application: String) {
    let level = match policy {
        CrashReportPolicy::Minimal => MINIMAL,
        CrashReportPolicy::Detailed => DETAILED,
    };
    {
        let mut context = CONTEXT.lock().unwrap();
        *context = Some(HookContext {
            store,
            application,
            detailed: level == DETAILED,
        });
    }
    if STATE.swap(level, Ordering::SeqCst) == UNINSTALLED {
        let previous = std::panic::take_hook();
        *PREVIOUS.lock().unwrap() = Some(previous);
        std::panic::set_hook(Box::new(crash_hook));
    }
}

/// Restores the previous panic hook and clears the captured context.
pub(crate) fn uninstall() {
    if STATE.swap(UNINSTALLED, Ordering::SeqCst) == UNINSTALLED {
        return;
    }
    let _ = std::panic::take_hook();
    if let Some(previous) = PREVIOUS.lock().unwrap().take() {
        std::panic::set_hook(previous);
    }
    CONTEXT.lock().unwrap().take();
}

pub(crate) fn is_installed() -> bool {
    STATE.load(Ordering::SeqCst) != UNINSTALLED
}

// Poisoned locks must not panic again inside the hook; that would abort.
fn crash_hook(info: &PanicHookInfo<'_>) {
    record_panic(info);
    let previous = PREVIOUS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(previous) = previous.as_ref() {
        previous(info);
    }
}

fn record_panic(info: &PanicHookInfo<'_>) {
    let context = CONTEXT
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let Some(context) = context.as_ref() else {
        return;
    };
    let message = info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    let reason = match info.location() {
        Some(location) => format!("{message} at {}:{}", location.file(), location.line()),
        None => message,
    };
    let stack = context
        .detailed
        .then(|| Backtrace::force_capture().to_string());
    let record = CrashRecord {
        application: context.application.clone(),
        name: "panic".to_string(),
        reason,
        stack,
        occurred_at_ms: Utc::now().timestamp_millis(),
    };
    if let Err(err) = context.store.write(&record) {
        log::debug!("failed to persist crash record: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    // The panic hook is process-global; serialize the tests that touch it.
    static HOOK_LOCK: Mutex<()> = Mutex::new(());

    fn unique_dir() -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let mut dir = env::temp_dir();
        dir.push(format!(
            "rumkit-crash-test-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = fs::create_dir_all(&dir);
        dir
    }

    #[test]
    fn store_round_trips_a_record_and_clears_it() {
        let dir = unique_dir();
        let store = CrashStore::for_application(Some(&dir), "demo app");
        let record = CrashRecord {
            application: "demo app".to_string(),
            name: "panic".to_string(),
            reason: "boom at src/ui.rs:1".to_string(),
            stack: None,
            occurred_at_ms: 123,
        };
        store.write(&record).expect("write record");

        let recovered = store.take().expect("take").expect("record present");
        assert_eq!(recovered.reason, record.reason);
        assert_eq!(recovered.occurred_at_ms, 123);
        // A second take finds nothing.
        assert!(store.take().expect("take again").is_none());
    }

    #[test]
    fn unparseable_records_are_deleted_and_reported() {
        let dir = unique_dir();
        let store = CrashStore::for_application(Some(&dir), "corrupt");
        if let Some(parent) = store.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        fs::write(&store.path, "not json").expect("write garbage");

        assert!(matches!(store.take(), Err(CrashStoreError::Invalid(_))));
        assert!(!store.path.exists(), "invalid record must be removed");
    }

    #[test]
    fn installed_hook_persists_a_panic_record() {
        let _guard = HOOK_LOCK.lock().unwrap();
        let dir = unique_dir();
        let store = CrashStore::for_application(Some(&dir), "hooked");
        install(
            CrashReportPolicy::Detailed,
            store.clone(),
            "hooked".to_string(),
        );
        assert!(is_installed());

        let result = std::thread::spawn(|| panic!("instrumented panic")).join();
        assert!(result.is_err());
        uninstall();
        assert!(!is_installed());

        let record = store.take().expect("take").expect("record present");
        assert!(record.reason.contains("instrumented panic"));
        assert!(record.stack.is_some(), "detailed mode captures a backtrace");
    }

    #[test]
    fn minimal_mode_skips_the_backtrace() {
        let _guard = HOOK_LOCK.lock().unwrap();
        let dir = unique_dir();
        let store = CrashStore::for_application(Some(&dir), "minimal");
        install(
            CrashReportPolicy::Minimal,
            store.clone(),
            "minimal".to_string(),
        );
        let _ = std::thread::spawn(|| panic!("small panic")).join();
        uninstall();

        let record = store.take().expect("take").expect("record present");
        assert!(record.stack.is_none());
    }
}
