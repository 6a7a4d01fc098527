use std::collections::HashSet;
use std::error::Error as StdError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use anyhow::Result;
use pushkit_core::{DeploymentStatus, LifecycleBridge, StatusReport};
use tracing::{debug, info, warn};

type ReadyOutcome = std::result::Result<Option<StatusReport>, ReadyError>;

/// First failure of the ready notification, handed to every later caller.
///
/// Keeps the original error with its context chain; reach it through
/// [`ReadyError::inner`] after downcasting the returned `anyhow::Error`.
#[derive(Debug, Clone)]
pub struct ReadyError(Arc<anyhow::Error>);

impl ReadyError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl fmt::Display for ReadyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The chain is exposed through `source`; print only the outer message.
        write!(f, "{}", self.0)
    }
}

impl StdError for ReadyError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.chain().nth(1)
    }
}

/// Reports the outcome of the previous launch to the lifecycle bridge.
///
/// The ready notification runs once per reporter; every later caller gets
/// the first outcome back. A report that cannot be recorded is persisted and
/// retried on the next foreground transition delivered through
/// [`StatusReporter::handle_foreground`].
pub struct StatusReporter {
    lifecycle: Arc<dyn LifecycleBridge>,
    ready: OnceLock<ReadyOutcome>,
    retry_armed: AtomicBool,
    /// Hashes whose rollback was already recorded by this reporter. A retried
    /// failure report must not count the same rollback again.
    marked_rollbacks: Mutex<HashSet<String>>,
}

impl StatusReporter {
    pub fn new(lifecycle: Arc<dyn LifecycleBridge>) -> Self {
        Self {
            lifecycle,
            ready: OnceLock::new(),
            retry_armed: AtomicBool::new(false),
            marked_rollbacks: Mutex::new(HashSet::new()),
        }
    }

    pub fn notify_ready(&self) -> Result<Option<StatusReport>> {
        self.ready
            .get_or_init(|| {
                self.notify_ready_once()
                    .map_err(|err| ReadyError(Arc::new(err)))
            })
            .clone()
            .map_err(anyhow::Error::new)
    }

    fn notify_ready_once(&self) -> Result<Option<StatusReport>> {
        self.lifecycle.notify_ready()?;
        let report = self.lifecycle.pending_report()?;
        if let Some(report) = &report {
            self.report_status(report);
        }
        Ok(report)
    }

    /// Returns whether the report was recorded. Failures are never surfaced
    /// to callers; the report is kept for a retry instead.
    pub fn report_status(&self, report: &StatusReport) -> bool {
        let Err(err) = self.try_report(report) else {
            return true;
        };

        warn!(error = %format!("{err:#}"), report = ?report, "report status failed");
        if let Err(persist_err) = self.lifecycle.persist_report_for_retry(report) {
            warn!(error = %format!("{persist_err:#}"), "failed to persist status report for retry");
        }
        if !self.retry_armed.swap(true, Ordering::SeqCst) {
            debug!("status report retry armed for the next foreground transition");
        }
        false
    }

    pub fn is_retry_armed(&self) -> bool {
        self.retry_armed.load(Ordering::SeqCst)
    }

    /// Foreground transition hook. Only does work while a retry is armed.
    pub fn handle_foreground(&self) {
        if !self.is_retry_armed() {
            return;
        }

        match self.lifecycle.pending_report() {
            Ok(Some(report)) => {
                if self.report_status(&report) {
                    self.retry_armed.store(false, Ordering::SeqCst);
                }
            }
            Ok(None) => {
                debug!("no status report left to retry");
                self.retry_armed.store(false, Ordering::SeqCst);
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to read pending status report");
            }
        }
    }

    fn try_report(&self, report: &StatusReport) -> Result<()> {
        match report {
            StatusReport::Binary { app_version, .. } => {
                info!(app_version = %app_version, "reporting binary update");
            }
            StatusReport::Release { package, status } => match status {
                DeploymentStatus::Succeeded => {
                    info!(label = %package.label, "reporting update success");
                }
                DeploymentStatus::Failed => {
                    info!(label = %package.label, "reporting update rollback");
                    self.mark_rollback_once(&package.package_hash)?;
                }
            },
        }
        self.lifecycle.record_report(report)
    }

    fn mark_rollback_once(&self, package_hash: &str) -> Result<()> {
        let mut marked = self
            .marked_rollbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if marked.contains(package_hash) {
            debug!(package_hash = %package_hash, "rollback already recorded for this report");
            return Ok(());
        }
        self.lifecycle.set_latest_rollback_info(package_hash)?;
        marked.insert(package_hash.to_string());
        Ok(())
    }
}
