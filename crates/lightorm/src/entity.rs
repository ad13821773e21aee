//! Entities: records over a closed column set with modified-field tracking.

use crate::error::OrmResult;
use crate::row::Row;
use crate::value::{FromValue, Value};

/// The data behind one entity instance.
///
/// `data` only ever holds declared columns. `modified` holds the columns
/// changed through [`set`](Self::set) since load or the last save, and is
/// always a subset of `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    columns: &'static [&'static str],
    data: Row,
    modified: Row,
    is_new: bool,
}

impl EntityState {
    /// Build state from a row.
    ///
    /// Undeclared columns are dropped and NULL values are skipped, so a NULL
    /// column reads back as the caller's default. Nothing is marked modified.
    pub fn new(columns: &'static [&'static str], row: Row, is_new: bool) -> Self {
        let data = row
            .into_iter()
            .filter(|(column, value)| !value.is_null() && columns.contains(&column.as_str()))
            .collect();

        Self {
            columns,
            data,
            modified: Row::new(),
            is_new,
        }
    }

    /// Declared columns.
    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    /// The stored value. A stored NULL reads as absent.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data.get(column).filter(|value| !value.is_null())
    }

    /// The stored value, or `default` when the column is absent, NULL or
    /// unknown.
    pub fn get_or(&self, column: &str, default: impl Into<Value>) -> Value {
        self.get(column).cloned().unwrap_or_else(|| default.into())
    }

    /// Typed read. An absent column decodes from NULL, which only succeeds
    /// for `Option<T>`.
    pub fn get_as<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        T::from_value(column, self.get(column).unwrap_or(&Value::Null))
    }

    /// Store a value and mark the column modified.
    ///
    /// Returns `false` (and changes nothing) for an undeclared column.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> bool {
        if !self.has_column(column) {
            tracing::debug!(column, "set on undeclared column ignored");
            return false;
        }
        let value = value.into();
        self.data.insert(column, value.clone());
        self.modified.insert(column, value);
        true
    }

    pub fn data(&self) -> &Row {
        &self.data
    }

    /// Columns changed since load or the last save, in first-set order.
    pub fn modified(&self) -> &Row {
        &self.modified
    }

    /// Replace the modified set. Undeclared columns are dropped and every
    /// kept value is written through to `data`.
    pub fn set_modified(&mut self, modified: Row) {
        self.modified = Row::new();
        for (column, value) in modified {
            self.set(&column, value);
        }
    }

    pub fn clear_modified(&mut self) {
        self.modified = Row::new();
    }

    pub fn is_modified(&self) -> bool {
        !self.modified.is_empty()
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.is_new = false;
    }
}

/// A record kind bound to one table.
///
/// Implement by hand or with `#[derive(Entity)]`:
///
/// ```ignore
/// use lightorm::{Entity, EntityState};
///
/// #[derive(Entity)]
/// #[orm(table = "users", columns = "id, username, level")]
/// struct User {
///     state: EntityState,
/// }
///
/// let mut user = User::create()?;
/// user.set("username", "alice");
/// assert!(user.is_modified());
/// ```
pub trait Entity: Sized {
    /// Table name.
    const TABLE: &'static str;
    /// Primary-key column.
    const PRIMARY_KEY: &'static str = "id";
    /// Declared columns.
    const COLUMNS: &'static [&'static str];

    /// Construct the entity around prepared state. May fail.
    fn from_state(state: EntityState) -> OrmResult<Self>;

    fn state(&self) -> &EntityState;

    fn state_mut(&mut self) -> &mut EntityState;

    /// Build from a row; `is_new` is `false` for hydrated rows.
    fn instantiate(row: Row, is_new: bool) -> OrmResult<Self> {
        Self::from_state(EntityState::new(Self::COLUMNS, row, is_new))
    }

    /// A new, empty record awaiting insert.
    fn create() -> OrmResult<Self> {
        Self::instantiate(Row::new(), true)
    }

    fn get(&self, column: &str) -> Option<&Value> {
        self.state().get(column)
    }

    fn get_or(&self, column: &str, default: impl Into<Value>) -> Value {
        self.state().get_or(column, default)
    }

    /// Set a declared column; unknown columns are ignored.
    fn set(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.state_mut().set(column, value);
        self
    }

    fn is_new(&self) -> bool {
        self.state().is_new()
    }

    fn is_modified(&self) -> bool {
        self.state().is_modified()
    }
}
