//! Upload Collector: per-session file registry with asynchronous extraction.
//!
//! Every file-set change bumps `revision` and clears the current report, so a
//! report can only ever describe the files that are registered right now.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::extraction::{ExtractionError, TextExtractor};
use crate::report::GeneratedReport;
use crate::uploads::models::{FileRole, FileStatus, FileSummary, IncomingFile, UploadedFile};

#[derive(Debug, Error, PartialEq)]
pub enum CollectorError {
    #[error("No file at index {index} (session has {len} files)")]
    NoSuchFile { index: usize, len: usize },
}

#[derive(Default)]
struct CollectorState {
    files: Vec<UploadedFile>,
    revision: u64,
    report: Option<GeneratedReport>,
}

impl CollectorState {
    fn invalidate(&mut self) {
        self.revision += 1;
        self.report = None;
    }
}

#[derive(Clone)]
pub struct UploadCollector {
    state: Arc<RwLock<CollectorState>>,
    extractor: Arc<dyn TextExtractor>,
    // Bumped after every status transition so `wait_settled` can re-check.
    changes: Arc<watch::Sender<u64>>,
}

impl UploadCollector {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(CollectorState::default())),
            extractor,
            changes: Arc::new(changes),
        }
    }

    /// Registers files under `role` and dispatches their extraction without waiting.
    ///
    /// Singleton roles keep only the newest file: previously registered files of
    /// that role are discarded, and of several files supplied at once the last wins.
    pub async fn add_files(&self, role: FileRole, files: Vec<IncomingFile>) -> Vec<FileSummary> {
        let mut files = files;
        if role.is_singleton() && files.len() > 1 {
            warn!(
                "{} files supplied for singleton role {}, keeping the last",
                files.len(),
                role
            );
            files = files.split_off(files.len() - 1);
        }
        if files.is_empty() {
            return self.files().await;
        }

        let registered: Vec<UploadedFile> = files
            .into_iter()
            .map(|f| UploadedFile::new(role, f.file_name, f.content))
            .collect();

        {
            let mut state = self.state.write().await;
            if role.is_singleton() {
                let before = state.files.len();
                state.files.retain(|f| f.role != role);
                if state.files.len() < before {
                    info!("Replaced previous {} file", role);
                }
            }
            state.files.extend(registered.iter().cloned());
            state.invalidate();
        }

        for file in registered {
            self.spawn_extraction(file);
        }
        self.notify();

        self.files().await
    }

    /// Evicts the file at `index` (position in the current listing) and clears the report.
    pub async fn remove_file(&self, index: usize) -> Result<FileSummary, CollectorError> {
        let removed = {
            let mut state = self.state.write().await;
            let len = state.files.len();
            if index >= len {
                return Err(CollectorError::NoSuchFile { index, len });
            }
            let removed = state.files.remove(index);
            state.invalidate();
            removed
        };
        info!("Removed {} file '{}'", removed.role, removed.file_name);
        self.notify();
        Ok(FileSummary::from_file(index, &removed))
    }

    /// Drops every file and the report, ready for a fresh submission.
    pub async fn clear(&self) {
        {
            let mut state = self.state.write().await;
            state.files.clear();
            state.invalidate();
        }
        self.notify();
    }

    pub async fn files(&self) -> Vec<FileSummary> {
        let state = self.state.read().await;
        state
            .files
            .iter()
            .enumerate()
            .map(|(i, f)| FileSummary::from_file(i, f))
            .collect()
    }

    /// Current files together with the revision they belong to.
    pub async fn snapshot(&self) -> (u64, Vec<UploadedFile>) {
        let state = self.state.read().await;
        (state.revision, state.files.clone())
    }

    pub async fn revision(&self) -> u64 {
        self.state.read().await.revision
    }

    pub async fn report(&self) -> Option<GeneratedReport> {
        self.state.read().await.report.clone()
    }

    /// Stores `report` if the file set is still at `revision`. Returns false for stale reports.
    pub async fn store_report(&self, revision: u64, report: GeneratedReport) -> bool {
        let mut state = self.state.write().await;
        if state.revision != revision {
            debug!(
                "Discarding report for revision {} (current {})",
                revision, state.revision
            );
            return false;
        }
        state.report = Some(report);
        true
    }

    /// Suspends until no registered file is pending or extracting.
    pub async fn wait_settled(&self) {
        let mut rx = self.changes.subscribe();
        loop {
            rx.borrow_and_update();
            {
                let state = self.state.read().await;
                if state.files.iter().all(|f| f.status.is_settled()) {
                    return;
                }
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn notify(&self) {
        self.changes.send_modify(|n| *n = n.wrapping_add(1));
    }

    fn spawn_extraction(&self, file: UploadedFile) {
        let collector = self.clone();
        tokio::spawn(async move {
            let Some(raw) = file.raw else { return };
            if !collector.set_status(file.id, FileStatus::Extracting).await {
                return;
            }

            let extractor = Arc::clone(&collector.extractor);
            let role = file.role;
            let name = file.file_name.clone();
            let result =
                tokio::task::spawn_blocking(move || extractor.extract(role, &name, &raw)).await;

            let status = match result {
                Ok(Ok(text)) => {
                    debug!(
                        "Extracted {} chars from {} file '{}'",
                        text.len(),
                        role,
                        file.file_name
                    );
                    FileStatus::Extracted { text }
                }
                Ok(Err(e)) => {
                    warn!("Extraction failed: {e}");
                    FileStatus::Failed {
                        detail: e.to_string(),
                    }
                }
                Err(join_err) => {
                    warn!("Extraction task for '{}' died: {join_err}", file.file_name);
                    FileStatus::Failed {
                        detail: ExtractionError::Aborted {
                            file_name: file.file_name.clone(),
                        }
                        .to_string(),
                    }
                }
            };
            collector.set_status(file.id, status).await;
        });
    }

    /// Updates the status of file `id`. Returns false when the file is gone.
    async fn set_status(&self, id: Uuid, status: FileStatus) -> bool {
        let found = {
            let mut state = self.state.write().await;
            match state.files.iter_mut().find(|f| f.id == id) {
                Some(file) => {
                    if status.is_settled() {
                        file.raw = None;
                    }
                    file.status = status;
                    true
                }
                None => false,
            }
        };
        if found {
            self.notify();
        } else {
            debug!("File {id} was removed before extraction finished");
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    use bytes::Bytes;

    /// Returns the bytes as text; fails for configured names; sleeps for slow names.
    struct FakeExtractor {
        failing: HashSet<&'static str>,
        slow: HashSet<&'static str>,
        panicking: HashSet<&'static str>,
    }

    impl FakeExtractor {
        fn ok() -> Self {
            Self {
                failing: HashSet::new(),
                slow: HashSet::new(),
                panicking: HashSet::new(),
            }
        }
    }

    impl TextExtractor for FakeExtractor {
        fn extract(
            &self,
            _role: FileRole,
            file_name: &str,
            bytes: &[u8],
        ) -> Result<String, ExtractionError> {
            if self.slow.contains(file_name) {
                std::thread::sleep(Duration::from_millis(100));
            }
            if self.panicking.contains(file_name) {
                panic!("extractor blew up");
            }
            if self.failing.contains(file_name) {
                return Err(ExtractionError::Pdf {
                    file_name: file_name.to_string(),
                    message: "corrupt".to_string(),
                });
            }
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    fn collector(extractor: FakeExtractor) -> UploadCollector {
        UploadCollector::new(Arc::new(extractor))
    }

    fn report() -> GeneratedReport {
        GeneratedReport {
            raw_text: "<div>report</div>".to_string(),
            received_at: chrono::Utc::now(),
            source_request_id: None,
            model: "test-model".to_string(),
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    #[tokio::test]
    async fn test_singleton_role_replaces_previous_file() {
        let c = collector(FakeExtractor::ok());
        c.add_files(
            FileRole::JobDescription,
            vec![IncomingFile::new("old.txt", Bytes::from_static(b"old"))],
        )
        .await;
        let files = c
            .add_files(
                FileRole::JobDescription,
                vec![IncomingFile::new("new.txt", Bytes::from_static(b"new"))],
            )
            .await;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "new.txt");
    }

    #[tokio::test]
    async fn test_singleton_role_keeps_last_of_batch() {
        let c = collector(FakeExtractor::ok());
        let files = c
            .add_files(
                FileRole::InterviewData,
                vec![
                    IncomingFile::new("a.csv", Bytes::from_static(b"a")),
                    IncomingFile::new("b.csv", Bytes::from_static(b"b")),
                ],
            )
            .await;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "b.csv");
    }

    #[tokio::test]
    async fn test_resumes_are_additive() {
        let c = collector(FakeExtractor::ok());
        c.add_files(
            FileRole::Resume,
            vec![IncomingFile::new("a.txt", Bytes::from_static(b"a"))],
        )
        .await;
        let files = c
            .add_files(
                FileRole::Resume,
                vec![
                    IncomingFile::new("b.txt", Bytes::from_static(b"b")),
                    IncomingFile::new("c.txt", Bytes::from_static(b"c")),
                ],
            )
            .await;
        assert_eq!(files.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_resume_does_not_block_siblings() {
        let mut extractor = FakeExtractor::ok();
        extractor.failing.insert("two.pdf");
        extractor.slow.insert("three.pdf");
        let c = collector(extractor);
        c.add_files(
            FileRole::Resume,
            vec![
                IncomingFile::new("one.pdf", Bytes::from_static(b"first")),
                IncomingFile::new("two.pdf", Bytes::from_static(b"second")),
                IncomingFile::new("three.pdf", Bytes::from_static(b"third")),
            ],
        )
        .await;

        c.wait_settled().await;

        let (_, files) = c.snapshot().await;
        assert_eq!(files[0].extracted_text(), Some("first"));
        assert!(matches!(files[1].status, FileStatus::Failed { .. }));
        assert_eq!(files[2].extracted_text(), Some("third"));
        assert!(files.iter().all(|f| f.raw.is_none()));
    }

    #[tokio::test]
    async fn test_panicking_extractor_marks_only_that_file_failed() {
        let mut extractor = FakeExtractor::ok();
        extractor.panicking.insert("bad.pdf");
        let c = collector(extractor);
        c.add_files(
            FileRole::Resume,
            vec![
                IncomingFile::new("bad.pdf", Bytes::from_static(b"x")),
                IncomingFile::new("good.pdf", Bytes::from_static(b"y")),
            ],
        )
        .await;
        c.wait_settled().await;

        let summaries = c.files().await;
        assert_eq!(summaries[0].status, "failed");
        assert_eq!(summaries[1].status, "extracted");
    }

    #[tokio::test]
    async fn test_remove_file_clears_report() {
        let c = collector(FakeExtractor::ok());
        c.add_files(
            FileRole::Resume,
            vec![IncomingFile::new("a.txt", Bytes::from_static(b"a"))],
        )
        .await;
        c.wait_settled().await;
        let revision = c.revision().await;
        assert!(c.store_report(revision, report()).await);
        assert!(c.report().await.is_some());

        c.remove_file(0).await.unwrap();
        assert!(c.report().await.is_none());
        assert!(c.files().await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_index_is_error() {
        let c = collector(FakeExtractor::ok());
        assert_eq!(
            c.remove_file(3).await.unwrap_err(),
            CollectorError::NoSuchFile { index: 3, len: 0 }
        );
    }

    #[tokio::test]
    async fn test_stale_report_is_discarded() {
        let c = collector(FakeExtractor::ok());
        let revision = c.revision().await;
        c.add_files(
            FileRole::Resume,
            vec![IncomingFile::new("a.txt", Bytes::from_static(b"a"))],
        )
        .await;
        assert!(!c.store_report(revision, report()).await);
        assert!(c.report().await.is_none());
    }

    #[tokio::test]
    async fn test_result_for_removed_file_is_dropped() {
        let mut extractor = FakeExtractor::ok();
        extractor.slow.insert("slow.pdf");
        let c = collector(extractor);
        c.add_files(
            FileRole::Resume,
            vec![IncomingFile::new("slow.pdf", Bytes::from_static(b"late"))],
        )
        .await;
        c.remove_file(0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(c.files().await.is_empty());
    }

    #[tokio::test]
    async fn test_wait_settled_returns_immediately_when_empty() {
        let c = collector(FakeExtractor::ok());
        tokio::time::timeout(Duration::from_secs(1), c.wait_settled())
            .await
            .unwrap();
    }
}
