//! Batch report and its text and JSON renderings

use crate::error::ErrorKind;
use crate::pipeline::{JobError, JobOutcome, JobResult, JobState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Results of one batch, in job order
#[derive(Debug)]
pub struct BatchReport {
    started_at: DateTime<Utc>,
    elapsed: Duration,
    results: Vec<JobResult>,
}

impl BatchReport {
    pub fn new(started_at: DateTime<Utc>, elapsed: Duration, results: Vec<JobResult>) -> Self {
        Self {
            started_at,
            elapsed,
            results,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn results(&self) -> &[JobResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &JobOutcome> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &JobError> {
        self.results.iter().filter_map(|r| r.as_ref().err())
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.is_err())
    }

    pub fn total_rows(&self) -> u64 {
        self.succeeded().map(|o| o.rows).sum()
    }

    /// Result for `dataset`, if a job for it ran
    pub fn result_for(&self, dataset: &str) -> Option<&JobResult> {
        self.results.iter().find(|r| match r {
            Ok(outcome) => outcome.dataset == dataset,
            Err(failure) => failure.dataset == dataset,
        })
    }

    /// One line per job, in run order
    pub fn status_lines(&self) -> Vec<String> {
        self.results
            .iter()
            .map(|result| match result {
                Ok(o) => format!("loaded {}: {} rows -> {}", o.dataset, o.rows, o.table.quoted()),
                Err(e) => format!("failed {}: {}: {}", e.dataset, e.error.kind(), e.error),
            })
            .collect()
    }

    pub fn totals_line(&self) -> String {
        format!(
            "batch completed: {} succeeded, {} failed, {} rows in {:.2}s",
            self.succeeded().count(),
            self.failed().count(),
            self.total_rows(),
            self.elapsed.as_secs_f64()
        )
    }

    /// Status lines followed by the totals line
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for line in self.status_lines() {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str(&self.totals_line());
        out.push('\n');
        out
    }

    pub fn summary(&self) -> BatchSummary<'_> {
        BatchSummary {
            started_at: self.started_at,
            elapsed_ms: self.elapsed.as_millis() as u64,
            succeeded: self.succeeded().count(),
            failed: self.failed().count(),
            rows: self.total_rows(),
            jobs: self.results.iter().map(JobSummary::from_result).collect(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.summary())
    }
}

/// Machine-readable form of a [`BatchReport`]
#[derive(Debug, Serialize)]
pub struct BatchSummary<'a> {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub succeeded: usize,
    pub failed: usize,
    pub rows: u64,
    pub jobs: Vec<JobSummary<'a>>,
}

#[derive(Debug, Serialize)]
pub struct JobSummary<'a> {
    pub dataset: &'a str,
    pub status: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<JobState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> JobSummary<'a> {
    fn from_result(result: &'a JobResult) -> Self {
        match result {
            Ok(o) => Self {
                dataset: &o.dataset,
                status: JobState::Succeeded,
                table: Some(o.table.to_string()),
                rows: Some(o.rows),
                columns: Some(o.columns),
                checksum: Some(&o.checksum),
                elapsed_ms: Some(o.elapsed.as_millis() as u64),
                stage: None,
                error_kind: None,
                error: None,
            },
            Err(e) => Self {
                dataset: &e.dataset,
                status: JobState::Failed,
                table: e.destination.as_ref().map(|t| t.to_string()),
                rows: None,
                columns: None,
                checksum: None,
                elapsed_ms: None,
                stage: Some(e.stage),
                error_kind: Some(e.error.kind()),
                error: Some(e.error.to_string()),
            },
        }
    }
}
