//! Audit Trail
//!
//! Every request issued, every response summary and every decision point is
//! handed to an [`AuditSink`]. Sinks are fire-and-forget: `record` cannot
//! fail, and a sink that loses events never changes what the reconciler does.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{info, warn};

/// Destination for audit events
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &str);
}

/// Emits events through `tracing` under the `audit` target
#[derive(Debug, Default)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&self, event: &str) {
        info!(target: "audit", "{}", event);
    }
}

/// Discards every event
#[derive(Debug, Default)]
pub struct NullAudit;

impl AuditSink for NullAudit {
    fn record(&self, _event: &str) {}
}

/// Keeps events in memory
#[derive(Debug, Default)]
pub struct MemoryAudit {
    events: Mutex<Vec<String>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, event: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.to_string());
        }
    }
}

/// Appends one line per event to a file.
///
/// The file is opened lazily on the first event. Open and write failures
/// are logged once and then ignored.
#[derive(Debug)]
pub struct FileAudit {
    path: PathBuf,
    file: Mutex<Option<File>>,
    failed: AtomicBool,
}

impl FileAudit {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: Mutex::new(None),
            failed: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, event: &str) -> std::io::Result<()> {
        let mut guard = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            *guard = Some(file);
        }

        match guard.as_mut() {
            Some(file) => writeln!(file, "{}", event),
            None => Ok(()),
        }
    }
}

impl AuditSink for FileAudit {
    fn record(&self, event: &str) {
        if self.failed.load(Ordering::Relaxed) {
            return;
        }

        if let Err(e) = self.write_line(event) {
            self.failed.store(true, Ordering::Relaxed);
            warn!(
                path = %self.path.display(),
                error = %e,
                "Audit log unavailable, further events are dropped"
            );
        }
    }
}
