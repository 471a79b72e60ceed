//! Parallel review coordination: bounded fan-out over per-file tasks.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indicatif::ProgressBar;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use vigil_core::{CommitInfo, FileReviewResult, VigilError};
use vigil_repo::notebook;

use crate::client::Reviewer;

/// One unit of review work, prepared single-threaded before the parallel
/// phase.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path relative to the checkout root; the identity in the report.
    pub relative_path: PathBuf,
    /// Absolute path to read.
    pub absolute_path: PathBuf,
    /// Language name for the prompt ("Python", "C#", ...).
    pub language: String,
    /// Jupyter notebook; code cells are extracted before review.
    pub notebook: bool,
    /// Last-commit metadata, when the file has history.
    pub commit: Option<CommitInfo>,
}

/// Coordinates concurrent per-file reviews against a rate-limited service.
///
/// A semaphore bounds in-flight tasks at `max_workers` (default 3); the
/// submission loop itself never blocks on a review. Individual task
/// failures become error-flagged records and never cancel siblings. One
/// result exists per submitted file when [`review_all`] returns.
///
/// [`review_all`]: ReviewPipeline::review_all
pub struct ReviewPipeline {
    reviewer: Arc<dyn Reviewer>,
    max_workers: usize,
    progress: ProgressBar,
    completed: Arc<AtomicUsize>,
}

impl ReviewPipeline {
    /// Create a pipeline with a hidden progress bar.
    pub fn new(reviewer: Arc<dyn Reviewer>, max_workers: usize) -> Self {
        Self {
            reviewer,
            max_workers: max_workers.max(1),
            progress: ProgressBar::hidden(),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the hidden progress bar with a visible one.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Files completed so far; equals the submitted count after
    /// [`review_all`](ReviewPipeline::review_all) returns.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Review all files with bounded concurrency.
    ///
    /// Results arrive in completion order, not submission order. The
    /// returned vec always has one record per submitted file.
    pub async fn review_all(&self, files: Vec<FileEntry>) -> Vec<FileReviewResult> {
        let total = files.len();
        self.progress.set_length(total as u64);

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut join_set = JoinSet::new();

        for entry in files {
            let reviewer = Arc::clone(&self.reviewer);
            let semaphore = Arc::clone(&semaphore);
            let completed = Arc::clone(&self.completed);
            let progress = self.progress.clone();

            join_set.spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                let path = entry.relative_path.clone();
                let result = match review_one(reviewer.as_ref(), entry).await {
                    Ok(result) => result,
                    Err(e) => FileReviewResult::failed(path, e.to_string()),
                };
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                progress.set_message(format!("{done}/{total} files reviewed"));
                progress.inc(1);
                result
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            if let Ok(result) = joined {
                results.push(result);
            }
        }
        self.progress.finish_and_clear();
        results
    }
}

/// Review a single file. Errors here are per-file; the caller converts
/// them into error-flagged records.
async fn review_one(reviewer: &dyn Reviewer, entry: FileEntry) -> Result<FileReviewResult, VigilError> {
    let bytes = tokio::fs::read(&entry.absolute_path).await?;
    let text = decode_text(&bytes);

    let code = if entry.notebook {
        notebook::extract_code_cells(&text)
            .map_err(|e| VigilError::Parse(format!("invalid notebook format: {e}")))?
    } else {
        text
    };

    let issues = reviewer
        .review_source(&code, &entry.language, entry.commit.as_ref())
        .await;
    Ok(FileReviewResult::reviewed(
        entry.relative_path,
        entry.commit,
        issues,
        code,
    ))
}

/// Decode file bytes as UTF-8, falling back to the permissive Windows-1252
/// single-byte mapping. Decoding never fails a task.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use vigil_core::{Issue, IssueType, Suggestion};

    fn entry(dir: &std::path::Path, name: &str) -> FileEntry {
        FileEntry {
            relative_path: PathBuf::from(name),
            absolute_path: dir.join(name),
            language: "Python".into(),
            notebook: false,
            commit: None,
        }
    }

    /// Reviewer that reports one issue per file and tracks concurrency.
    struct StubReviewer {
        in_flight: AtomicUsize,
        max_seen: AtomicUsize,
    }

    impl StubReviewer {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_seen: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Reviewer for StubReviewer {
        async fn review_source(
            &self,
            _code: &str,
            _language: &str,
            _commit: Option<&CommitInfo>,
        ) -> Vec<Issue> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(25)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            vec![Issue {
                issue_type: IssueType::BestPractice,
                line: 1,
                message: "stub finding".into(),
                code: None,
                suggestion: Suggestion::default(),
                impact: None,
                effort: None,
                commit: None,
                pr: None,
                original_code: None,
            }]
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn five_files_three_workers_all_results_present() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = Vec::new();
        for i in 0..5 {
            let name = format!("f{i}.py");
            std::fs::write(dir.path().join(&name), format!("x = {i}\n")).unwrap();
            files.push(entry(dir.path(), &name));
        }

        let reviewer = Arc::new(StubReviewer::new());
        let pipeline = ReviewPipeline::new(reviewer.clone(), 3);
        let results = pipeline.review_all(files).await;

        assert_eq!(results.len(), 5);
        assert_eq!(pipeline.completed(), 5);
        assert!(reviewer.max_seen.load(Ordering::SeqCst) <= 3);
        for result in &results {
            assert!(result.error.is_none());
            assert_eq!(result.issue_count(), 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn unreadable_files_become_error_records_without_cancelling_siblings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.py"), "x = 1\n").unwrap();
        let files = vec![
            entry(dir.path(), "ok.py"),
            entry(dir.path(), "missing_a.py"),
            entry(dir.path(), "missing_b.py"),
        ];

        let pipeline = ReviewPipeline::new(Arc::new(StubReviewer::new()), 3);
        let results = pipeline.review_all(files).await;

        assert_eq!(results.len(), 3);
        assert_eq!(pipeline.completed(), 3);
        let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
        assert_eq!(failed.len(), 2);
        for record in failed {
            assert_eq!(record.issue_count(), 0);
        }
        let ok = results
            .iter()
            .find(|r| r.path == PathBuf::from("ok.py"))
            .unwrap();
        assert!(ok.error.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_task_failing_still_yields_all_records() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<FileEntry> = (0..4)
            .map(|i| entry(dir.path(), &format!("ghost{i}.py")))
            .collect();

        let pipeline = ReviewPipeline::new(Arc::new(StubReviewer::new()), 2);
        let results = pipeline.review_all(files).await;
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.error.is_some()));
    }

    #[tokio::test]
    async fn notebook_entries_are_extracted_before_review() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("nb.ipynb"),
            r#"{"cells": [{"cell_type": "code", "source": ["x = 1\n"]}]}"#,
        )
        .unwrap();
        let mut file = entry(dir.path(), "nb.ipynb");
        file.notebook = true;

        let pipeline = ReviewPipeline::new(Arc::new(StubReviewer::new()), 1);
        let results = pipeline.review_all(vec![file]).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].error.is_none());
        assert_eq!(results[0].source, "x = 1\n");
    }

    #[tokio::test]
    async fn malformed_notebook_is_an_error_record() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.ipynb"), "not json").unwrap();
        let mut file = entry(dir.path(), "bad.ipynb");
        file.notebook = true;

        let pipeline = ReviewPipeline::new(Arc::new(StubReviewer::new()), 1);
        let results = pipeline.review_all(vec![file]).await;
        assert_eq!(results.len(), 1);
        assert!(results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("invalid notebook format"));
    }

    #[test]
    fn latin1_bytes_decode_without_failing() {
        // 0xE9 is 'é' in Windows-1252 and invalid as standalone UTF-8.
        let bytes = [b'v', 0xE9, b'l', b'o'];
        assert_eq!(decode_text(&bytes), "vélo");
    }

    #[test]
    fn utf8_bytes_pass_through() {
        assert_eq!(decode_text("héllo".as_bytes()), "héllo");
    }
}
