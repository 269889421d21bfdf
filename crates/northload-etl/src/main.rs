//! Northload - CSV to PostgreSQL batch loader

use anyhow::{Context, Result};
use clap::Parser;
use northload_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use northload_etl::cli::{Cli, EXIT_CONFIG, EXIT_JOB_FAILED, EXIT_OK};
use northload_etl::config::EtlConfig;
use northload_etl::pipeline::Pipeline;
use northload_etl::reader::CsvReader;
use northload_etl::replace::{postgres, MemoryWarehouse, PgTableReplacer, TableReplacer};
use northload_etl::BatchReport;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .output(LogOutput::Console)
        .log_file_prefix("northload")
        .filter_directives("sqlx=warn")
        .build();

    // Environment variables take precedence
    let log_config = match log_config.clone().with_env_overrides() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring invalid logging settings: {:#}", e);
            log_config
        },
    };

    // The loader works without logging, so a failed init is not fatal
    let _ = init_logging(&log_config);

    let report = match run(&cli).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Batch could not start");
            eprintln!("Error: {:#}", e);
            process::exit(EXIT_CONFIG);
        },
    };

    if cli.json {
        match report.to_json_pretty() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: could not render summary: {}", e);
                process::exit(EXIT_JOB_FAILED);
            },
        }
    } else {
        print!("{}", report.render_text());
    }

    process::exit(if report.has_failures() {
        EXIT_JOB_FAILED
    } else {
        EXIT_OK
    });
}

/// Load configuration, pick the store and run the batch
async fn run(cli: &Cli) -> Result<BatchReport> {
    let mut config =
        EtlConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    let replacer: Arc<dyn TableReplacer> = if cli.dry_run {
        info!("Dry run: loading into an in-memory warehouse");
        Arc::new(MemoryWarehouse::new().with_batch_size(config.batch_size))
    } else {
        info!(database = %config.database.redacted_url(), "Loading into PostgreSQL");
        let pool = postgres::connect_lazy(&config.database);
        Arc::new(PgTableReplacer::new(pool).with_batch_size(config.batch_size))
    };

    let pipeline = Pipeline::new(config.resolver()?, replacer)
        .with_reader(CsvReader::new(config.reader.clone()));

    let jobs = if cli.datasets.is_empty() {
        pipeline.default_jobs(&config.data_dir)
    } else {
        pipeline.selected_jobs(&config.data_dir, &cli.datasets)
    };

    Ok(pipeline.run(jobs).await)
}
