//! Entry point: owns the connection and hands out builders and repositories.

use crate::entity::Entity;
use crate::error::OrmResult;
use crate::executor::{Connection, Executor, Params};
use crate::qb::QueryBuilder;
use crate::repository::Repository;
use crate::row::RowSet;

/// Factory for query builders and repositories over one connection.
///
/// # Example
/// ```
/// # #[cfg(feature = "sqlite")]
/// # fn main() -> lightorm::OrmResult<()> {
/// use lightorm::{DataSource, Params};
///
/// let ds = DataSource::sqlite_in_memory()?;
/// ds.query("create table t (id integer primary key, name text)", &Params::none())?;
///
/// let id = ds.create_query_builder("t", None).insert([("name", "a")])?;
/// assert_eq!(id, lightorm::Value::Int(1));
/// # Ok(())
/// # }
/// # #[cfg(not(feature = "sqlite"))]
/// # fn main() {}
/// ```
#[derive(Clone, Debug)]
pub struct DataSource {
    connection: Connection,
}

impl DataSource {
    /// Wrap an executor.
    pub fn new<E: Executor + 'static>(executor: E) -> Self {
        Self::from_connection(Connection::new(executor))
    }

    pub fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }

    /// Private in-memory SQLite database.
    #[cfg(feature = "sqlite")]
    pub fn sqlite_in_memory() -> OrmResult<Self> {
        Ok(Self::new(rusqlite::Connection::open_in_memory()?))
    }

    /// SQLite database file at `path` (created if missing).
    #[cfg(feature = "sqlite")]
    pub fn sqlite(path: impl AsRef<std::path::Path>) -> OrmResult<Self> {
        Ok(Self::new(rusqlite::Connection::open(path)?))
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Run a native statement.
    pub fn query(&self, sql: &str, params: &Params) -> OrmResult<RowSet> {
        self.connection.execute_native_query(sql, params)
    }

    pub fn create_query_builder(&self, table: &str, alias: Option<&str>) -> QueryBuilder {
        QueryBuilder::new(self.connection.clone(), table, alias)
    }

    pub fn repository<E: Entity>(&self) -> Repository<E> {
        Repository::new(self.connection.clone())
    }
}
