//! Command-line interface definition

use crate::config::EtlConfig;
use clap::Parser;
use std::path::PathBuf;

/// Exit status when every job succeeded
pub const EXIT_OK: i32 = 0;

/// Exit status when the batch ran but at least one job failed
pub const EXIT_JOB_FAILED: i32 = 1;

/// Exit status when the batch could not start
pub const EXIT_CONFIG: i32 = 2;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "northload")]
#[command(author, version, about = "Load CSV exports into PostgreSQL by full table replacement", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "NORTHLOAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory containing the source CSV files
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Load only this dataset (repeatable)
    #[arg(long = "dataset", value_name = "KEY")]
    pub datasets: Vec<String>,

    /// Load into an in-memory warehouse instead of PostgreSQL
    #[arg(long)]
    pub dry_run: bool,

    /// Print the batch summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Apply flags that override configuration values
    pub fn apply_overrides(&self, config: &mut EtlConfig) {
        if let Some(ref dir) = self.data_dir {
            config.data_dir = dir.clone();
        }
    }
}
