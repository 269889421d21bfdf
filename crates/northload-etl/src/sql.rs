//! SQL rendering for the full-replace sequence

use crate::resolver::{quote_identifier, TableName};
use crate::rowset::{ColumnDescriptor, ColumnType};

/// PostgreSQL accepts at most this many bind parameters per statement
pub const MAX_BIND_PARAMS: usize = 65_535;

pub fn native_type(kind: ColumnType) -> &'static str {
    match kind {
        ColumnType::Text => "TEXT",
        ColumnType::Integer => "BIGINT",
        ColumnType::Float => "DOUBLE PRECISION",
        ColumnType::Boolean => "BOOLEAN",
        ColumnType::Date => "DATE",
    }
}

/// Removes the table and everything that depends on it; a no-op when absent
pub fn drop_table(table: &TableName) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", table.quoted())
}

pub fn create_table(table: &TableName, columns: &[ColumnDescriptor]) -> String {
    let definitions = columns
        .iter()
        .map(|c| format!("{} {}", quote_identifier(&c.name), native_type(c.kind)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", table.quoted(), definitions)
}

/// `INSERT INTO t ("a", "b") ` prefix; the VALUES list is pushed by the caller
pub fn insert_prefix(table: &TableName, columns: &[ColumnDescriptor]) -> String {
    let names = columns
        .iter()
        .map(|c| quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({}) ", table.quoted(), names)
}

/// Rows per INSERT so that `rows * columns` stays within the bind limit
pub fn rows_per_statement(batch_size: usize, column_count: usize) -> usize {
    let cap = MAX_BIND_PARAMS / column_count.max(1);
    batch_size.clamp(1, cap.max(1))
}
