//! Shared fixtures for the northload integration tests
//!
//! - CSV fixtures written into a temporary data directory
//! - A PostgreSQL container for the tests marked `requires Docker`

#![allow(dead_code)]

use anyhow::{Context, Result};
use northload_etl::config::DatabaseConfig;
use northload_etl::replace::postgres;
use sqlx::PgPool;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::info;

pub const CUSTOMERS_CSV: &str = "\
customer_id,name,city
1,  Alice  ,Berlin
2,Bob,London
3,Carol,
";

pub const PRODUCTS_CSV: &str = "\
product_id,product_name,unit_price,discontinued
1,Chai,18.0,false
2,Chang,19,false
3,Aniseed Syrup,10.5,true
4,Chef Anton's Cajun Seasoning,22,true
";

pub const ORDERS_CSV: &str = "\
order_id,customer_id,order_date,ship_city
10248,1,1996-07-04,Reims
10249,2,1996-07-05,Münster
";

// ============================================================================
// CSV fixtures
// ============================================================================

/// Temporary data directory holding source files
pub struct DataDir {
    dir: TempDir,
}

impl DataDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `<dataset>.csv` and return its path
    pub fn write(&self, dataset: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(format!("{}.csv", dataset));
        fs::write(&path, content).expect("Failed to write fixture");
        path
    }

    pub fn file(&self, dataset: &str) -> PathBuf {
        self.dir.path().join(format!("{}.csv", dataset))
    }
}

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

pub struct TestPostgres {
    container: ContainerAsync<Postgres>,
    config: DatabaseConfig,
    pool: PgPool,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let config = DatabaseConfig {
            host: host.to_string(),
            port,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "postgres".to_string(),
            max_connections: 2,
            connect_timeout_secs: 30,
        };

        let pool = postgres::connect_lazy(&config);
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self {
            container,
            config,
            pool,
        })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn row_count(&self, qualified: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT count(*) FROM {}", qualified))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count rows of {}", qualified))?;
        Ok(count)
    }

    pub async fn view_exists(&self, schema: &str, view: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.views \
             WHERE table_schema = $1 AND table_name = $2)",
        )
        .bind(schema)
        .bind(view)
        .fetch_one(&self.pool)
        .await
        .context("Failed to query information_schema.views")?;
        Ok(exists)
    }

    /// `(column_name, data_type)` pairs in ordinal order
    pub async fn column_types(&self, schema: &str, table: &str) -> Result<Vec<(String, String)>> {
        let columns = sqlx::query_as::<_, (String, String)>(
            "SELECT column_name::text, data_type::text FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query information_schema.columns")?;
        Ok(columns)
    }
}
