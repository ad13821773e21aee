//! Executor capability and the connection handle that shares it.

use crate::error::OrmResult;
use crate::row::RowSet;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Named bindings: placeholder name (without the leading `:`) to value.
pub type Bindings = BTreeMap<String, Value>;

/// How placeholders in a statement are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// `:name` placeholders bound by name.
    Associative,
    /// `?` placeholders bound by position.
    Positional,
}

/// Parameters for one statement.
///
/// The variant decides the bind mode; a statement never mixes the two.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Associative mode.
    Named(Bindings),
    /// Positional mode.
    Positional(Vec<Value>),
}

impl Params {
    /// Empty associative parameters.
    pub fn none() -> Self {
        Params::Named(Bindings::new())
    }

    /// The bind mode these parameters require.
    pub fn mode(&self) -> BindMode {
        match self {
            Params::Named(_) => BindMode::Associative,
            Params::Positional(_) => BindMode::Positional,
        }
    }

    /// Number of bound values.
    pub fn len(&self) -> usize {
        match self {
            Params::Named(b) => b.len(),
            Params::Positional(v) => v.len(),
        }
    }

    /// Whether there are no bound values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Params {
    fn default() -> Self {
        Params::none()
    }
}

impl From<Bindings> for Params {
    fn from(bindings: Bindings) -> Self {
        Params::Named(bindings)
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

/// Runs one parameterized statement against a relational engine.
///
/// Implementations prepare `sql`, bind `params` in the mode the variant
/// names, execute, and report rows, the row count and the last insert id.
/// Store errors are returned as-is; callers never retry.
pub trait Executor {
    /// Execute a statement.
    fn execute(&self, sql: &str, params: &Params) -> OrmResult<RowSet>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, sql: &str, params: &Params) -> OrmResult<RowSet> {
        (**self).execute(sql, params)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(&self, sql: &str, params: &Params) -> OrmResult<RowSet> {
        (**self).execute(sql, params)
    }
}

impl<E: Executor + ?Sized> Executor for Rc<E> {
    fn execute(&self, sql: &str, params: &Params) -> OrmResult<RowSet> {
        (**self).execute(sql, params)
    }
}

/// A cheap, clonable handle over a shared executor.
///
/// Query builders and repositories each hold a clone. The handle is
/// single-threaded (`Rc`), matching the blocking, one-caller-at-a-time
/// execution model.
#[derive(Clone)]
pub struct Connection {
    executor: Rc<dyn Executor>,
}

impl Connection {
    /// Wrap an executor.
    pub fn new<E: Executor + 'static>(executor: E) -> Self {
        Self {
            executor: Rc::new(executor),
        }
    }

    /// Wrap an already shared executor.
    pub fn from_rc(executor: Rc<dyn Executor>) -> Self {
        Self { executor }
    }

    /// The underlying executor.
    pub fn executor(&self) -> &dyn Executor {
        &*self.executor
    }

    /// Execute a native statement.
    pub fn execute_native_query(&self, sql: &str, params: &Params) -> OrmResult<RowSet> {
        tracing::trace!(
            target: "lightorm.sql",
            mode = ?params.mode(),
            param_count = params.len(),
            sql = %sql,
            "executing native query"
        );
        self.executor.execute(sql, params)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("executor", &"<dyn Executor>")
            .finish()
    }
}
