//! In-memory tabular data extracted from one source file

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Semantic type of a column, inferred once when the source is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Boolean,
    Date,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ColumnType::Text)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnType,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A single typed cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Ordered columns plus ordered rows; every row holds one value per column.
///
/// The column set is fixed at construction. Rows are stored positionally, so
/// `rows[i][j]` belongs to `columns[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<Value>>,
}

impl RowSet {
    /// Build a row-set, checking that names are unique and every row has
    /// exactly one value per column.
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<Value>>) -> Result<Self, String> {
        for (idx, column) in columns.iter().enumerate() {
            if columns[..idx].iter().any(|c| c.name == column.name) {
                return Err(format!("duplicate column name '{}'", column.name));
            }
        }

        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(format!(
                "row {} has {} values, expected {}",
                idx + 1,
                row.len(),
                columns.len()
            ));
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Value of `column` in row `row`
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All values of one column, in row order
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Values may be rewritten in place; row length must not change.
    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<Value>] {
        &mut self.rows
    }

    pub fn into_parts(self) -> (Vec<ColumnDescriptor>, Vec<Vec<Value>>) {
        (self.columns, self.rows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> RowSet {
        RowSet::new(
            vec![
                ColumnDescriptor::new("id", ColumnType::Integer),
                ColumnDescriptor::new("name", ColumnType::Text),
            ],
            vec![
                vec![Value::Integer(1), Value::Text("Alice".into())],
                vec![Value::Integer(2), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_by_name() {
        let rows = sample();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.get(0, "name"), Some(&Value::Text("Alice".into())));
        assert_eq!(rows.get(1, "name"), Some(&Value::Null));
        assert_eq!(rows.get(0, "email"), None);
        assert_eq!(rows.get(5, "id"), None);
        assert_eq!(rows.column("id").map(|c| c.kind), Some(ColumnType::Integer));

        let ids: Vec<_> = rows.column_values("id").unwrap().cloned().collect();
        assert_eq!(ids, vec![Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let err = RowSet::new(
            vec![
                ColumnDescriptor::new("id", ColumnType::Integer),
                ColumnDescriptor::new("id", ColumnType::Text),
            ],
            vec![],
        )
        .unwrap_err();
        assert!(err.contains("duplicate column name 'id'"));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = RowSet::new(
            vec![ColumnDescriptor::new("id", ColumnType::Integer)],
            vec![vec![Value::Integer(1)], vec![]],
        )
        .unwrap_err();
        assert_eq!(err, "row 2 has 0 values, expected 1");
    }

    #[test]
    fn test_value_display() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2020-01-01");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
    }
}
