//! In-memory warehouse
//!
//! Backs `--dry-run` and the pipeline tests. It keeps the semantics that the
//! pipeline relies on from PostgreSQL: cascade drops remove dependent views
//! (transitively), and a failed replace leaves the prior table untouched.

use super::{ReplaceStats, TableReplacer, DEFAULT_BATCH_SIZE};
use crate::error::{EtlError, EtlResult};
use crate::resolver::TableName;
use crate::rowset::{ColumnDescriptor, RowSet, Value};
use crate::sql;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredTable {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<Value>>,
}

impl StoredTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Object a view reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relation {
    Table(TableName),
    View(String),
}

/// Step of a replace that should fail for a given table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Drop,
    Create,
    Insert,
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<TableName, StoredTable>,
    views: BTreeMap<String, Vec<Relation>>,
    failures: HashMap<TableName, FailurePoint>,
}

impl State {
    /// Views that (directly or through other views) read from `table`
    fn dependents_of(&self, table: &TableName) -> Vec<String> {
        let mut doomed: Vec<String> = Vec::new();
        let mut frontier = vec![Relation::Table(table.clone())];

        while let Some(relation) = frontier.pop() {
            for (name, deps) in &self.views {
                if !doomed.contains(name) && deps.contains(&relation) {
                    doomed.push(name.clone());
                    frontier.push(Relation::View(name.clone()));
                }
            }
        }

        doomed
    }
}

#[derive(Debug)]
pub struct MemoryWarehouse {
    state: RwLock<State>,
    batch_size: usize,
}

impl Default for MemoryWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub async fn table(&self, table: &TableName) -> Option<StoredTable> {
        self.state.read().await.tables.get(table).cloned()
    }

    pub async fn table_names(&self) -> Vec<TableName> {
        self.state.read().await.tables.keys().cloned().collect()
    }

    /// Put a table in place directly, as if loaded by an earlier run
    pub async fn seed_table(&self, table: TableName, contents: StoredTable) {
        self.state.write().await.tables.insert(table, contents);
    }

    pub async fn create_view(&self, name: &str, depends_on: Vec<Relation>) -> EtlResult<()> {
        let mut state = self.state.write().await;
        for relation in &depends_on {
            let exists = match relation {
                Relation::Table(t) => state.tables.contains_key(t),
                Relation::View(v) => state.views.contains_key(v),
            };
            if !exists {
                return Err(EtlError::schema_conflict(
                    name,
                    format!("view depends on missing relation {:?}", relation),
                ));
            }
        }
        state.views.insert(name.to_string(), depends_on);
        Ok(())
    }

    pub async fn view_exists(&self, name: &str) -> bool {
        self.state.read().await.views.contains_key(name)
    }

    /// Make every later replace of `table` fail at `point`
    pub async fn inject_failure(&self, table: TableName, point: FailurePoint) {
        self.state.write().await.failures.insert(table, point);
    }

    pub async fn clear_failures(&self) {
        self.state.write().await.failures.clear();
    }
}

#[async_trait]
impl TableReplacer for MemoryWarehouse {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn replace(&self, table: &TableName, rows: &RowSet) -> EtlResult<ReplaceStats> {
        let mut state = self.state.write().await;

        // Every step is checked before anything is mutated, which is what
        // makes the replace atomic.
        match state.failures.get(table) {
            Some(FailurePoint::Drop) => {
                return Err(EtlError::schema_conflict(table, "drop failed: injected failure"));
            },
            Some(FailurePoint::Create) => {
                return Err(EtlError::schema_conflict(table, "create failed: injected failure"));
            },
            Some(FailurePoint::Insert) => {
                return Err(EtlError::write_failure(table, "injected failure"));
            },
            None => {},
        }

        for view in state.dependents_of(table) {
            debug!(table = %table, view = %view, "dropping dependent view");
            state.views.remove(&view);
        }

        state.tables.insert(
            table.clone(),
            StoredTable {
                columns: rows.columns().to_vec(),
                rows: rows.rows().to_vec(),
            },
        );

        let per_statement = sql::rows_per_statement(self.batch_size, rows.columns().len());
        Ok(ReplaceStats {
            rows_written: rows.len() as u64,
            statements: rows.len().div_ceil(per_statement),
        })
    }
}
