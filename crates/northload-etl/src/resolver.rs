//! Dataset key to destination table mapping

use crate::error::{EtlError, EtlResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// PostgreSQL truncates identifiers longer than this many bytes
pub const MAX_IDENTIFIER_BYTES: usize = 63;

pub const DEFAULT_SCHEMA: &str = "public";

/// Datasets loaded when no configuration overrides them, in load order
pub const DEFAULT_DATASETS: &[&str] = &["customers", "products", "orders", "order_details"];

/// Schema-qualified destination table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName {
    pub schema: String,
    pub table: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> EtlResult<Self> {
        let name = Self {
            schema: schema.into(),
            table: table.into(),
        };
        validate_identifier(&name.schema)?;
        validate_identifier(&name.table)?;
        Ok(name)
    }

    /// Parse `schema.table`, or a bare `table` in `default_schema`
    pub fn parse(qualified: &str, default_schema: &str) -> EtlResult<Self> {
        match qualified.split_once('.') {
            Some((schema, table)) => Self::new(schema, table),
            None => Self::new(default_schema, qualified),
        }
    }

    /// Quoted form safe to splice into SQL, e.g. `"public"."customers"`
    pub fn quoted(&self) -> String {
        format!("{}.{}", quote_identifier(&self.schema), quote_identifier(&self.table))
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Double-quote an identifier, doubling embedded quotes
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn validate_identifier(ident: &str) -> EtlResult<()> {
    if ident.is_empty() {
        return Err(EtlError::config("identifier cannot be empty"));
    }
    if ident.len() > MAX_IDENTIFIER_BYTES {
        return Err(EtlError::config(format!(
            "identifier '{}' exceeds {} bytes",
            ident, MAX_IDENTIFIER_BYTES
        )));
    }
    if ident.contains('\0') {
        return Err(EtlError::config("identifier cannot contain NUL"));
    }
    Ok(())
}

/// One configured dataset: where it comes from and where it lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    pub key: String,
    pub table: TableName,
    /// Source file, relative to the data directory unless absolute
    pub file: PathBuf,
}

impl DatasetSpec {
    /// `key` loaded from `<key>.csv` into `<schema>.<key>`
    pub fn conventional(key: &str, schema: &str) -> EtlResult<Self> {
        Ok(Self {
            key: key.to_string(),
            table: TableName::new(schema, key)?,
            file: PathBuf::from(format!("{}.csv", key)),
        })
    }
}

/// Static dataset-to-table mapping
#[derive(Debug, Clone, Default)]
pub struct DestinationResolver {
    datasets: Vec<DatasetSpec>,
}

impl DestinationResolver {
    pub fn new(datasets: Vec<DatasetSpec>) -> EtlResult<Self> {
        for (idx, spec) in datasets.iter().enumerate() {
            if datasets[..idx].iter().any(|d| d.key == spec.key) {
                return Err(EtlError::config(format!("dataset '{}' configured twice", spec.key)));
            }
        }
        Ok(Self { datasets })
    }

    /// customers, products, orders and order_details in `schema`
    pub fn with_defaults(schema: &str) -> EtlResult<Self> {
        let datasets = DEFAULT_DATASETS
            .iter()
            .map(|key| DatasetSpec::conventional(key, schema))
            .collect::<EtlResult<Vec<_>>>()?;
        Self::new(datasets)
    }

    pub fn resolve(&self, key: &str) -> EtlResult<&TableName> {
        self.dataset(key)
            .map(|d| &d.table)
            .ok_or_else(|| EtlError::UnknownDataset(key.to_string()))
    }

    pub fn dataset(&self, key: &str) -> Option<&DatasetSpec> {
        self.datasets.iter().find(|d| d.key == key)
    }

    pub fn datasets(&self) -> &[DatasetSpec] {
        &self.datasets
    }
}
