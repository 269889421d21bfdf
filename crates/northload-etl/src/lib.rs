//! Northload ETL
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads flat CSV exports into a PostgreSQL warehouse. Every run rebuilds each
//! destination table from scratch: drop (cascading to dependent views),
//! create from the inferred column types, bulk insert.
//!
//! Per job, data flows through:
//!
//! 1. [`resolver`] - dataset key to destination table
//! 2. [`reader`] - CSV file to a typed [`rowset::RowSet`]
//! 3. [`normalize`] - text column cleaning
//! 4. [`replace`] - atomic drop/create/insert
//!
//! [`pipeline::Pipeline`] runs the jobs of a batch one after another and
//! collects a [`report::BatchReport`]; a failing job never stops the others.
//!
//! # Example
//!
//! ```no_run
//! use northload_etl::config::EtlConfig;
//! use northload_etl::pipeline::Pipeline;
//! use northload_etl::replace::MemoryWarehouse;
//! use std::sync::Arc;
//!
//! # async fn run() -> northload_etl::EtlResult<()> {
//! let config = EtlConfig::load(None)?;
//! let pipeline = Pipeline::new(config.resolver()?, Arc::new(MemoryWarehouse::new()));
//! let report = pipeline.run(pipeline.default_jobs(&config.data_dir)).await;
//! print!("{}", report.render_text());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod reader;
pub mod replace;
pub mod report;
pub mod resolver;
pub mod rowset;
pub mod sql;

pub use error::{ErrorKind, EtlError, EtlResult};
pub use pipeline::{Job, JobError, JobOutcome, JobState, Pipeline};
pub use report::BatchReport;
