//! Result rows and row sets.

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, Value};

/// One result row: column name to value, in select-list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append (or overwrite) a column.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    /// Builder form of [`Row::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Get a column value by name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Get a column and convert it.
    ///
    /// A missing column is a decode error; a NULL converts through `FromValue`
    /// (so it succeeds for `Option<T>`).
    pub fn try_get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| OrmError::decode(column, "column not present in row"))?;
        T::from_value(column, value)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

/// Trait for types that can be built from a [`Row`].
pub trait FromRow: Sized {
    /// Build `Self` from a result row.
    fn from_row(row: &Row) -> OrmResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(row.clone())
    }
}

/// Everything an executor reports back for one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// Rows returned by the statement (empty for writes).
    pub rows: Vec<Row>,
    /// Rows returned for queries, rows affected for writes.
    pub row_count: u64,
    /// Generated key of the last inserted row, if the engine reports one.
    pub last_insert_id: Option<Value>,
}

impl RowSet {
    /// A row set for a query result; `row_count` is the number of rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            row_count: rows.len() as u64,
            rows,
            last_insert_id: None,
        }
    }

    /// A row set for a write that affected `row_count` rows.
    pub fn affected(row_count: u64) -> Self {
        Self {
            rows: Vec::new(),
            row_count,
            last_insert_id: None,
        }
    }

    /// Attach a last insert id.
    pub fn with_last_insert_id(mut self, id: impl Into<Value>) -> Self {
        self.last_insert_id = Some(id.into());
        self
    }

    /// Map every row with [`FromRow`].
    pub fn map_rows<T: FromRow>(&self) -> OrmResult<Vec<T>> {
        self.rows.iter().map(T::from_row).collect()
    }
}
