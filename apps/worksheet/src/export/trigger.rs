//! Export trigger — the state machine behind an export button.
//!
//! `Idle → Exporting → Success | Error → (after 3 s) Idle`. While a request is in
//! flight further requests are ignored. The status is published on a
//! `tokio::sync::watch` channel so any number of observers can follow it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::export::pipeline::{ExportArtifact, ExportPipeline};
use crate::export::{ExportFormat, ExportOptions};

/// How long a terminal status stays visible before reverting to idle.
pub const STATUS_RESET_AFTER: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum ExportStatus {
    Idle,
    Exporting,
    Success,
    Error(String),
}

#[derive(Debug)]
pub enum TriggerOutcome {
    Completed(ExportArtifact),
    Failed(String),
    /// Another export was already running.
    Ignored,
}

/// Clears the in-flight flag when the request finishes, however it finishes.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ExportTrigger {
    pipeline: Arc<ExportPipeline>,
    target_id: String,
    in_flight: Arc<AtomicBool>,
    status: Arc<watch::Sender<ExportStatus>>,
    reset: Mutex<Option<JoinHandle<()>>>,
    reset_after: Duration,
}

impl ExportTrigger {
    pub fn new(pipeline: Arc<ExportPipeline>, target_id: impl Into<String>) -> Self {
        let (status, _) = watch::channel(ExportStatus::Idle);
        ExportTrigger {
            pipeline,
            target_id: target_id.into(),
            in_flight: Arc::new(AtomicBool::new(false)),
            status: Arc::new(status),
            reset: Mutex::new(None),
            reset_after: STATUS_RESET_AFTER,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ExportStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> ExportStatus {
        self.status.borrow().clone()
    }

    /// Button text for the current status.
    pub fn status_label(&self, format: ExportFormat) -> &'static str {
        match self.status() {
            ExportStatus::Idle => format.label(),
            ExportStatus::Exporting => "导出中...",
            ExportStatus::Success => "导出成功！",
            ExportStatus::Error(_) => "导出失败",
        }
    }

    /// Runs one export unless another is already in flight.
    pub async fn trigger(&self, format: ExportFormat, options: &ExportOptions) -> TriggerOutcome {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            info!(format = ?format, "Export already in progress; request ignored");
            return TriggerOutcome::Ignored;
        }
        let _in_flight = InFlight(self.in_flight.clone());
        let request_id = Uuid::new_v4();
        info!(%request_id, format = ?format, "Export requested");

        self.cancel_reset();
        self.status.send_replace(ExportStatus::Exporting);

        let outcome = match self
            .pipeline
            .capture_and_export(&self.target_id, format, options)
            .await
        {
            Ok(artifact) => {
                info!(%request_id, path = %artifact.path.display(), "Export succeeded");
                self.status.send_replace(ExportStatus::Success);
                TriggerOutcome::Completed(artifact)
            }
            Err(e) => {
                error!(%request_id, reason = e.reason(), "Export failed: {}", e);
                self.status
                    .send_replace(ExportStatus::Error(e.reason().to_string()));
                TriggerOutcome::Failed(e.to_string())
            }
        };

        self.schedule_reset();
        outcome
    }

    fn cancel_reset(&self) {
        if let Some(handle) = self.lock_reset().take() {
            handle.abort();
        }
    }

    fn schedule_reset(&self) {
        let status = self.status.clone();
        let delay = self.reset_after;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            status.send_replace(ExportStatus::Idle);
        });
        if let Some(previous) = self.lock_reset().replace(handle) {
            previous.abort();
        }
    }

    fn lock_reset(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.reset.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ExportTrigger {
    fn drop(&mut self) {
        self.cancel_reset();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
