//! PostgreSQL table replacer
//!
//! Drop, create and insert share one transaction, and PostgreSQL DDL is
//! transactional, so readers see either the old table or the fully loaded
//! new one. Dropping the uncommitted transaction rolls everything back.

use super::{ReplaceStats, TableReplacer, DEFAULT_BATCH_SIZE};
use crate::config::DatabaseConfig;
use crate::error::{EtlError, EtlResult};
use crate::resolver::TableName;
use crate::rowset::{ColumnType, RowSet, Value};
use crate::sql;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder, Transaction};
use std::time::Duration;
use tracing::{debug, info};

/// Pool that connects on first use, so an unreachable database fails the
/// first job instead of the whole process.
pub fn connect_lazy(config: &DatabaseConfig) -> PgPool {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect_lazy_with(config.connect_options());

    info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        user = %config.user,
        "Database pool configured"
    );

    pool
}

#[derive(Debug, Clone)]
pub struct PgTableReplacer {
    pool: PgPool,
    batch_size: usize,
}

impl PgTableReplacer {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_rows(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        table: &TableName,
        rows: &RowSet,
    ) -> EtlResult<ReplaceStats> {
        let columns = rows.columns();
        let per_statement = sql::rows_per_statement(self.batch_size, columns.len());
        let prefix = sql::insert_prefix(table, columns);
        let mut stats = ReplaceStats::default();

        for chunk in rows.rows().chunks(per_statement) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(prefix.as_str());
            builder.push_values(chunk, |mut b, row| {
                for (value, column) in row.iter().zip(columns) {
                    push_value(&mut b, value, column.kind);
                }
            });

            let result = builder
                .build()
                .execute(&mut **tx)
                .await
                .map_err(|e| EtlError::write_failure(table, e))?;

            stats.rows_written += result.rows_affected();
            stats.statements += 1;
            debug!(
                table = %table,
                written = stats.rows_written,
                total = rows.len(),
                "insert batch committed to transaction"
            );
        }

        Ok(stats)
    }
}

#[async_trait]
impl TableReplacer for PgTableReplacer {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn replace(&self, table: &TableName, rows: &RowSet) -> EtlResult<ReplaceStats> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EtlError::schema_conflict(table, e))?;

        let drop = sql::drop_table(table);
        sqlx::query(&drop)
            .execute(&mut *tx)
            .await
            .map_err(|e| EtlError::schema_conflict(table, format!("drop failed: {}", e)))?;

        let create = sql::create_table(table, rows.columns());
        sqlx::query(&create)
            .execute(&mut *tx)
            .await
            .map_err(|e| EtlError::schema_conflict(table, format!("create failed: {}", e)))?;

        let stats = self.insert_rows(&mut tx, table, rows).await?;
        if stats.rows_written != rows.len() as u64 {
            return Err(EtlError::write_failure(
                table,
                format!("inserted {} of {} rows", stats.rows_written, rows.len()),
            ));
        }

        tx.commit()
            .await
            .map_err(|e| EtlError::write_failure(table, format!("commit failed: {}", e)))?;

        Ok(stats)
    }
}

/// Bind one cell; nulls carry the column's type so PostgreSQL can check them
fn push_value(b: &mut Separated<'_, '_, Postgres, &'static str>, value: &Value, kind: ColumnType) {
    match value {
        Value::Null => match kind {
            ColumnType::Text => {
                b.push_bind(None::<String>);
            },
            ColumnType::Integer => {
                b.push_bind(None::<i64>);
            },
            ColumnType::Float => {
                b.push_bind(None::<f64>);
            },
            ColumnType::Boolean => {
                b.push_bind(None::<bool>);
            },
            ColumnType::Date => {
                b.push_bind(None::<NaiveDate>);
            },
        },
        Value::Text(s) => {
            b.push_bind(s.clone());
        },
        Value::Integer(i) => {
            b.push_bind(*i);
        },
        Value::Float(x) => {
            b.push_bind(*x);
        },
        Value::Boolean(v) => {
            b.push_bind(*v);
        },
        Value::Date(d) => {
            b.push_bind(*d);
        },
    }
}
