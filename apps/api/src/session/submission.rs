use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::payload::{validate, ValidationError};
use crate::prompt::{assemble, Prompt};
use crate::report::{GeneratedReport, ReportError, ReportGenerator};
use crate::session::scheduler::DebounceScheduler;
use crate::uploads::models::{FileRole, FileSummary, IncomingFile};
use crate::uploads::{CollectorError, UploadCollector};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("A report is already being generated for this session")]
    InFlight,

    #[error("The files changed while the report was being generated")]
    Superseded,
}

impl SubmissionError {
    pub fn code(&self) -> &'static str {
        match self {
            SubmissionError::Validation(e) => e.code(),
            SubmissionError::Report(e) => e.code(),
            SubmissionError::InFlight => "SUBMISSION_IN_PROGRESS",
            SubmissionError::Superseded => "REPORT_SUPERSEDED",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::Report(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Last failed submission, kept for pollers until inputs change or a run succeeds.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionFailure {
    pub code: &'static str,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub auto_generate: bool,
    pub revision: u64,
    pub files: Vec<FileSummary>,
    pub has_report: bool,
    pub generating: bool,
    pub last_error: Option<SubmissionFailure>,
}

/// One user's isolated files, report and submission state.
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    collector: UploadCollector,
    generator: Arc<dyn ReportGenerator>,
    /// Quiet period for automatic generation. `None` means manual only.
    auto_generate: Option<Duration>,
    /// Held for the whole run so two generations never overlap.
    submission: Mutex<()>,
    in_flight: Mutex<Option<CancellationToken>>,
    last_error: RwLock<Option<SubmissionFailure>>,
    scheduler: DebounceScheduler,
    last_touched: Mutex<Instant>,
}

impl Session {
    pub fn new(
        collector: UploadCollector,
        generator: Arc<dyn ReportGenerator>,
        auto_generate: Option<Duration>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            collector,
            generator,
            auto_generate,
            submission: Mutex::new(()),
            in_flight: Mutex::new(None),
            last_error: RwLock::new(None),
            scheduler: DebounceScheduler::default(),
            last_touched: Mutex::new(Instant::now()),
        }
    }

    /// Marks the session as in use. Idle eviction measures from the last touch.
    pub async fn touch(&self) {
        *self.last_touched.lock().await = Instant::now();
    }

    pub async fn idle_for(&self) -> Duration {
        self.last_touched.lock().await.elapsed()
    }

    pub async fn is_generating(&self) -> bool {
        self.in_flight.lock().await.is_some()
    }

    pub async fn add_files(
        self: &Arc<Self>,
        role: FileRole,
        files: Vec<IncomingFile>,
    ) -> Vec<FileSummary> {
        if files.is_empty() {
            return self.collector.files().await;
        }
        let summaries = self.collector.add_files(role, files).await;
        self.inputs_changed(true).await;
        summaries
    }

    pub async fn remove_file(self: &Arc<Self>, index: usize) -> Result<FileSummary, CollectorError> {
        let removed = self.collector.remove_file(index).await?;
        self.inputs_changed(true).await;
        Ok(removed)
    }

    /// Clears every file and the report. Nothing is scheduled for an empty session.
    pub async fn reset(self: &Arc<Self>) {
        self.collector.clear().await;
        self.inputs_changed(false).await;
        info!("Session {} reset", self.id);
    }

    /// Manual submission. Rejected while another run holds the session.
    pub async fn submit(&self) -> Result<GeneratedReport, SubmissionError> {
        let guard = self
            .submission
            .try_lock()
            .map_err(|_| SubmissionError::InFlight)?;
        self.run(guard, CancellationToken::new()).await
    }

    /// Cancels the in-flight run and any pending scheduled run.
    /// Returns false when there was nothing to cancel.
    pub async fn cancel(&self) -> bool {
        let scheduled = self.scheduler.cancel().await;
        let running = self.cancel_in_flight().await;
        scheduled || running
    }

    /// Validates and assembles what would be sent, without sending it.
    pub async fn prompt_preview(&self) -> Result<Prompt, ValidationError> {
        self.collector.wait_settled().await;
        let (_, files) = self.collector.snapshot().await;
        Ok(assemble(&validate(&files)?))
    }

    pub async fn report(&self) -> Option<GeneratedReport> {
        self.collector.report().await
    }

    pub async fn status(&self) -> SessionStatus {
        SessionStatus {
            id: self.id,
            created_at: self.created_at,
            auto_generate: self.auto_generate.is_some(),
            revision: self.collector.revision().await,
            files: self.collector.files().await,
            has_report: self.collector.report().await.is_some(),
            generating: self.is_generating().await,
            last_error: self.last_error.read().await.clone(),
        }
    }

    /// Stops all background work. Called when the session is deleted.
    pub async fn shutdown(&self) {
        self.cancel().await;
    }

    async fn inputs_changed(self: &Arc<Self>, reschedule: bool) {
        if self.cancel_in_flight().await {
            info!("Session {}: inputs changed, cancelled in-flight report", self.id);
        }
        *self.last_error.write().await = None;

        match self.auto_generate {
            Some(delay) if reschedule => {
                let session = Arc::clone(self);
                self.scheduler
                    .schedule(delay, move |token| async move {
                        session.run_scheduled(token).await;
                    })
                    .await;
            }
            _ => {
                self.scheduler.cancel().await;
            }
        }
    }

    /// Scheduled runs wait for any manual run to finish instead of being rejected.
    async fn run_scheduled(&self, token: CancellationToken) {
        let guard = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            guard = self.submission.lock() => guard,
        };
        match self.run(guard, token).await {
            Ok(_) => debug!("Session {}: scheduled report stored", self.id),
            Err(SubmissionError::Validation(e)) => {
                debug!("Session {}: scheduled run skipped: {e}", self.id)
            }
            Err(e) => debug!("Session {}: scheduled run ended: {e}", self.id),
        }
    }

    async fn run(
        &self,
        _guard: MutexGuard<'_, ()>,
        cancel: CancellationToken,
    ) -> Result<GeneratedReport, SubmissionError> {
        *self.in_flight.lock().await = Some(cancel.clone());
        *self.last_error.write().await = None;

        let result = self.generate(&cancel).await;

        *self.in_flight.lock().await = None;
        match &result {
            Ok(report) => info!(
                "Session {}: report generated ({} chars, {} output tokens)",
                self.id,
                report.raw_text.len(),
                report.output_tokens
            ),
            Err(SubmissionError::Report(ReportError::Cancelled)) => {
                info!("Session {}: report generation cancelled", self.id)
            }
            Err(e) => {
                warn!("Session {}: submission failed: {e}", self.id);
                *self.last_error.write().await = Some(SubmissionFailure {
                    code: e.code(),
                    message: e.user_message(),
                    at: Utc::now(),
                });
            }
        }
        result
    }

    async fn generate(&self, cancel: &CancellationToken) -> Result<GeneratedReport, SubmissionError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReportError::Cancelled.into()),
            _ = self.collector.wait_settled() => {}
        }

        let (revision, files) = self.collector.snapshot().await;
        let payload = validate(&files).inspect_err(|e| {
            warn!("Session {}: validation failed ({}): {e}", self.id, e.code());
        })?;
        let prompt = assemble(&payload);
        debug!(
            "Session {}: sending {} candidates ({} prompt chars)",
            self.id,
            payload.candidates.len(),
            prompt.system.len() + prompt.user.len()
        );

        let report = self.generator.generate(&prompt, cancel).await?;
        if !self.collector.store_report(revision, report.clone()).await {
            return Err(SubmissionError::Superseded);
        }
        Ok(report)
    }

    async fn cancel_in_flight(&self) -> bool {
        match self.in_flight.lock().await.as_ref() {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                true
            }
            _ => false,
        }
    }
}
