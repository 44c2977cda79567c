//! Query result containers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::SqlValue;

/// A single result row. Column names and the name-to-index lookup are shared
/// across every row of a result set.
#[derive(Debug, Clone)]
pub struct ResultRow {
    column_names: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
    values: Vec<SqlValue>,
}

impl ResultRow {
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Value for the named column, if present in this row.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.index
            .get(column)
            .and_then(|&position| self.values.get(position))
    }

    /// Value at the given column position.
    #[must_use]
    pub fn get_index(&self, position: usize) -> Option<&SqlValue> {
        self.values.get(position)
    }

    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

/// An executed statement's result: zero or more rows plus the affected-row
/// count for statements that return none.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    results: Vec<ResultRow>,
    rows_affected: usize,
    column_names: Option<Arc<Vec<String>>>,
    index: Option<Arc<HashMap<String, usize>>>,
}

impl ResultSet {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        ResultSet {
            results: Vec::with_capacity(capacity),
            rows_affected: 0,
            column_names: None,
            index: None,
        }
    }

    /// Set the shared column names for every row added afterwards. Builds the
    /// name-to-index lookup once.
    pub fn set_column_names(&mut self, names: Vec<String>) {
        let index: HashMap<String, usize> = names
            .iter()
            .enumerate()
            .map(|(position, name)| (name.clone(), position))
            .collect();
        self.column_names = Some(Arc::new(names));
        self.index = Some(Arc::new(index));
    }

    /// Append a row of values, sharing the column-name metadata.
    pub fn add_row_values(&mut self, values: Vec<SqlValue>) {
        let column_names = self
            .column_names
            .get_or_insert_with(|| Arc::new(Vec::new()))
            .clone();
        let index = self
            .index
            .get_or_insert_with(|| Arc::new(HashMap::new()))
            .clone();
        self.results.push(ResultRow {
            column_names,
            index,
            values,
        });
        self.rows_affected += 1;
    }

    #[must_use]
    pub fn rows(&self) -> &[ResultRow] {
        &self.results
    }

    #[must_use]
    pub fn rows_affected(&self) -> usize {
        self.rows_affected
    }

    pub fn set_rows_affected(&mut self, count: usize) {
        self.rows_affected = count;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }
}
