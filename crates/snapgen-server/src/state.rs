//! Shared server state and event dispatch
//!
//! Webhook events are acknowledged before any snapshot work happens; the
//! pipeline runs on a spawned task and its terminal outcome is logged once
//! and broadcast as an [`EventReport`].

use serde::Serialize;
use snapgen_core::{PipelineError, PipelineOutcome, PushEvent, SnapshotPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const REPORT_CAPACITY: usize = 64;

/// Terminal status of one webhook event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EventStatus {
    /// Snapshot written and indexed
    Snapshotted {
        /// Written HTML file
        path: PathBuf,
        /// Renderer request URL
        renderer_url: String,
        /// Index length after the append
        index_len: usize,
    },
    /// Nothing to do
    Skipped {
        /// Why
        reason: String,
    },
    /// Pipeline aborted
    Failed {
        /// Step that failed
        stage: String,
        /// Error message
        error: String,
    },
}

/// Outcome of one webhook event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventReport {
    /// Repository full name
    pub repository: String,
    /// Snapshotted commit, if the push had one
    pub commit: Option<String>,
    /// Terminal status
    #[serde(flatten)]
    pub status: EventStatus,
}

impl EventReport {
    fn new(event: &PushEvent, result: &Result<PipelineOutcome, PipelineError>) -> Self {
        let status = match result {
            Ok(PipelineOutcome::Snapshotted(snapshot)) => EventStatus::Snapshotted {
                path: snapshot.path.clone(),
                renderer_url: snapshot.renderer_url.clone(),
                index_len: snapshot.index_len,
            },
            Ok(outcome) => EventStatus::Skipped {
                reason: outcome.to_string(),
            },
            Err(e) => EventStatus::Failed {
                stage: e.stage().to_string(),
                error: e.to_string(),
            },
        };

        Self {
            repository: event.repo().to_string(),
            commit: event.first_commit().map(|c| c.id.to_string()),
            status,
        }
    }

    /// Whether the pipeline failed
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.status, EventStatus::Failed { .. })
    }
}

/// Run the pipeline for `event` and log how it ended
pub async fn process_event(pipeline: &SnapshotPipeline, event: &PushEvent) -> EventReport {
    let result = pipeline.run(event).await;
    let report = EventReport::new(event, &result);
    let commit = report.commit.as_deref().unwrap_or("-");

    match &result {
        Ok(PipelineOutcome::Snapshotted(snapshot)) => tracing::info!(
            repository = %report.repository,
            commit,
            path = %snapshot.path.display(),
            status = snapshot.status,
            bytes = snapshot.bytes,
            records = snapshot.index_len,
            "snapshot stored"
        ),
        Ok(outcome) => tracing::info!(
            repository = %report.repository,
            commit,
            reason = %outcome,
            "snapshot skipped"
        ),
        Err(e) => tracing::error!(
            repository = %report.repository,
            commit,
            stage = e.stage(),
            error = %e,
            "snapshot failed"
        ),
    }

    report
}

/// State shared by the route handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pipeline: Arc<SnapshotPipeline>,
    reports: broadcast::Sender<EventReport>,
}

impl AppState {
    /// Create state around a pipeline
    #[must_use]
    pub fn new(pipeline: SnapshotPipeline) -> Self {
        let (reports, _) = broadcast::channel(REPORT_CAPACITY);
        Self {
            pipeline: Arc::new(pipeline),
            reports,
        }
    }

    /// Pipeline
    #[inline]
    #[must_use]
    pub fn pipeline(&self) -> &SnapshotPipeline {
        &self.pipeline
    }

    /// Receive the report of every event dispatched after this call
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventReport> {
        self.reports.subscribe()
    }

    /// Process `event` in the background
    pub fn dispatch(&self, event: PushEvent) -> JoinHandle<EventReport> {
        let pipeline = Arc::clone(&self.pipeline);
        let reports = self.reports.clone();
        tokio::spawn(async move {
            let report = process_event(&pipeline, &event).await;
            // No subscribers is the normal case outside tests.
            let _ = reports.send(report.clone());
            report
        })
    }
}
