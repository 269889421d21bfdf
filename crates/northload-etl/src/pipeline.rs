//! Batch orchestration
//!
//! Each job is resolved, read, normalized and replaced on its own. A failing
//! job is logged and recorded in the [`BatchReport`]; the remaining jobs still
//! run.

use crate::error::EtlError;
use crate::normalize::Normalizer;
use crate::reader::CsvReader;
use crate::replace::TableReplacer;
use crate::report::BatchReport;
use crate::resolver::{DestinationResolver, TableName};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};

/// One dataset to load from one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub dataset: String,
    pub source: PathBuf,
}

impl Job {
    pub fn new(dataset: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            dataset: dataset.into(),
            source: source.into(),
        }
    }
}

/// Lifecycle of a single job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Reading,
    Normalizing,
    Replacing,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Reading => "reading",
            JobState::Normalizing => "normalizing",
            JobState::Replacing => "replacing",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub dataset: String,
    pub table: TableName,
    pub rows: u64,
    pub columns: usize,
    pub statements: usize,
    /// SHA-256 of the source file
    pub checksum: String,
    pub source_bytes: u64,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct JobError {
    pub dataset: String,
    /// Set once the dataset key resolved
    pub destination: Option<TableName>,
    /// State the job was in when it failed
    pub stage: JobState,
    pub error: EtlError,
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error.kind(), self.error)
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub type JobResult = Result<JobOutcome, JobError>;

/// Tracks the state of one running job and logs each transition
struct JobTracker<'a> {
    dataset: &'a str,
    state: JobState,
    destination: Option<TableName>,
}

impl<'a> JobTracker<'a> {
    fn new(dataset: &'a str) -> Self {
        Self {
            dataset,
            state: JobState::Pending,
            destination: None,
        }
    }

    fn advance(&mut self, next: JobState) {
        debug!(dataset = self.dataset, from = %self.state, to = %next, "job state");
        self.state = next;
    }

    fn fail(self, error: EtlError) -> JobError {
        debug!(dataset = self.dataset, from = %self.state, to = %JobState::Failed, "job state");
        JobError {
            dataset: self.dataset.to_string(),
            destination: self.destination,
            stage: self.state,
            error,
        }
    }
}

pub struct Pipeline {
    reader: CsvReader,
    normalizer: Normalizer,
    resolver: DestinationResolver,
    replacer: Arc<dyn TableReplacer>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("reader", &self.reader)
            .field("normalizer", &self.normalizer)
            .field("resolver", &self.resolver)
            .field("backend", &self.replacer.backend())
            .finish()
    }
}

impl Pipeline {
    pub fn new(resolver: DestinationResolver, replacer: Arc<dyn TableReplacer>) -> Self {
        Self {
            reader: CsvReader::default(),
            normalizer: Normalizer::default(),
            resolver,
            replacer,
        }
    }

    pub fn with_reader(mut self, reader: CsvReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn resolver(&self) -> &DestinationResolver {
        &self.resolver
    }

    /// One job per configured dataset, in configured order
    pub fn default_jobs(&self, data_dir: &Path) -> Vec<Job> {
        self.resolver
            .datasets()
            .iter()
            .map(|spec| Job::new(spec.key.clone(), data_dir.join(&spec.file)))
            .collect()
    }

    /// Jobs for the given keys only. Keys without a mapping still produce a
    /// job (sourced from `<key>.csv`) so that they are reported as failed.
    pub fn selected_jobs(&self, data_dir: &Path, keys: &[String]) -> Vec<Job> {
        keys.iter()
            .map(|key| {
                let file = self
                    .resolver
                    .dataset(key)
                    .map(|spec| spec.file.clone())
                    .unwrap_or_else(|| PathBuf::from(format!("{}.csv", key)));
                Job::new(key.clone(), data_dir.join(file))
            })
            .collect()
    }

    /// Run every job in order. Never fails; per-job errors land in the report.
    pub async fn run(&self, jobs: Vec<Job>) -> BatchReport {
        let started_at = Utc::now();
        let clock = Instant::now();

        info!(jobs = jobs.len(), backend = self.replacer.backend(), "Starting batch");

        let mut results = Vec::with_capacity(jobs.len());
        for job in &jobs {
            let result = self.run_job(job).await;
            match &result {
                Ok(outcome) => info!(
                    dataset = %outcome.dataset,
                    table = %outcome.table,
                    rows = outcome.rows,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "Job succeeded"
                ),
                Err(failure) => error!(
                    dataset = %failure.dataset,
                    table = ?failure.destination.as_ref().map(|t| t.to_string()),
                    stage = %failure.stage,
                    kind = %failure.error.kind(),
                    error = %failure.error,
                    "Job failed"
                ),
            }
            results.push(result);
        }

        let report = BatchReport::new(started_at, clock.elapsed(), results);
        info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            "Batch completed"
        );
        report
    }

    /// Resolve, read, normalize and replace a single job
    #[instrument(skip(self, job), fields(dataset = %job.dataset))]
    pub async fn run_job(&self, job: &Job) -> JobResult {
        let started = Instant::now();
        let mut tracker = JobTracker::new(&job.dataset);

        let table = match self.resolver.resolve(&job.dataset) {
            Ok(table) => table.clone(),
            Err(e) => return Err(tracker.fail(e)),
        };
        tracker.destination = Some(table.clone());

        tracker.advance(JobState::Reading);
        let extract = match self.reader.read(&job.source) {
            Ok(extract) => extract,
            Err(e) => return Err(tracker.fail(e)),
        };

        tracker.advance(JobState::Normalizing);
        let rows = self.normalizer.normalize(extract.rows);

        tracker.advance(JobState::Replacing);
        let stats = match self.replacer.replace(&table, &rows).await {
            Ok(stats) => stats,
            Err(e) => return Err(tracker.fail(e)),
        };

        tracker.advance(JobState::Succeeded);
        Ok(JobOutcome {
            dataset: job.dataset.clone(),
            table,
            rows: stats.rows_written,
            columns: rows.columns().len(),
            statements: stats.statements,
            checksum: extract.checksum,
            source_bytes: extract.bytes,
            elapsed: started.elapsed(),
        })
    }
}
