//! Column-level cleaning applied between extraction and load

use crate::rowset::{RowSet, Value};
use std::borrow::Cow;

/// A cleaning step applied to every value of every text column.
///
/// Implementations must be idempotent: applying a transform to its own output
/// returns the value unchanged.
pub trait TextTransform: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply<'a>(&self, value: &'a str) -> Cow<'a, str>;
}

/// Strips leading and trailing whitespace
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimWhitespace;

impl TextTransform for TrimWhitespace {
    fn name(&self) -> &'static str {
        "trim_whitespace"
    }

    fn apply<'a>(&self, value: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(value.trim())
    }
}

pub struct Normalizer {
    transforms: Vec<Box<dyn TextTransform>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(vec![Box::new(TrimWhitespace)])
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.transforms.iter().map(|t| t.name()))
            .finish()
    }
}

impl Normalizer {
    pub fn new(transforms: Vec<Box<dyn TextTransform>>) -> Self {
        Self { transforms }
    }

    pub fn transform_names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Apply every transform to the text columns of `rows`.
    ///
    /// Non-text columns and nulls are returned as they came in.
    pub fn normalize(&self, mut rows: RowSet) -> RowSet {
        let text_columns: Vec<usize> = rows
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind.is_text())
            .map(|(idx, _)| idx)
            .collect();

        if text_columns.is_empty() || self.transforms.is_empty() {
            return rows;
        }

        for row in rows.rows_mut() {
            for &idx in &text_columns {
                if let Value::Text(ref mut text) = row[idx] {
                    if let Some(cleaned) = self.clean(text) {
                        *text = cleaned;
                    }
                }
            }
        }

        rows
    }

    /// Absence in, absence out
    pub fn normalize_opt(&self, rows: Option<RowSet>) -> Option<RowSet> {
        rows.map(|rows| self.normalize(rows))
    }

    /// `None` when no transform changed the value
    fn clean(&self, value: &str) -> Option<String> {
        let mut changed: Option<String> = None;
        for transform in &self.transforms {
            let input = changed.as_deref().unwrap_or(value);
            let output = transform.apply(input);
            if output != input {
                changed = Some(output.into_owned());
            }
        }
        changed
    }
}
