//! Full-replace of destination tables
//!
//! A replace is three steps against one destination:
//!
//! 1. drop the table if present, cascading to dependent objects
//! 2. create it from the row-set's column descriptors
//! 3. insert every row
//!
//! Implementations run the steps atomically: on failure the destination is
//! left exactly as it was before the call.

pub mod memory;
pub mod postgres;

pub use memory::MemoryWarehouse;
pub use postgres::PgTableReplacer;

use crate::error::EtlResult;
use crate::resolver::TableName;
use crate::rowset::RowSet;
use async_trait::async_trait;
use serde::Serialize;

/// Default number of rows per INSERT statement
pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReplaceStats {
    pub rows_written: u64,
    pub statements: usize,
}

#[async_trait]
pub trait TableReplacer: Send + Sync {
    /// Short label for logs ("postgres", "memory")
    fn backend(&self) -> &'static str;

    /// Replace `table` so that it holds exactly `rows`.
    ///
    /// Drop and create failures are `SchemaConflict`; insert and commit
    /// failures are `WriteFailure`.
    async fn replace(&self, table: &TableName, rows: &RowSet) -> EtlResult<ReplaceStats>;
}
