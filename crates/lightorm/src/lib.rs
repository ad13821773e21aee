//! # lightorm
//!
//! A small synchronous ORM: a fluent SQL query builder, entities with
//! modified-field tracking, and repositories that map rows to entities.
//!
//! ## Features
//!
//! - **Query builder**: staged operators grouped with `wrap` / `wrap_or`,
//!   automatic `:placeholderN` bindings, raw SQL where you need it
//! - **Find options**: a small structured query DSL, also accepted as JSON
//! - **Dirty tracking**: `save` only writes the columns you `set`
//! - **Pluggable executor**: anything implementing [`Executor`]; a `rusqlite`
//!   implementation ships behind the `sqlite` feature
//! - **Query monitoring**: timing, hooks and statistics via [`monitor`]
//!
//! ## Quick start
//!
//! ```ignore
//! use lightorm::prelude::*;
//!
//! #[derive(Entity)]
//! #[orm(table = "users", columns = "id, username, level")]
//! struct User {
//!     state: EntityState,
//! }
//!
//! let ds = DataSource::sqlite_in_memory()?;
//! let users = ds.repository::<User>();
//!
//! let mut alice = User::create()?;
//! alice.set("username", "alice").set("level", 9);
//! users.save(&mut alice)?;
//!
//! let admins = users.find(
//!     FindOptions::new().where_group(ConditionGroup::new().op("level", "ge", 9)),
//! )?;
//! ```

pub mod data_source;
pub mod entity;
pub mod error;
pub mod executor;
pub mod monitor;
pub mod prelude;
pub mod qb;
pub mod repository;
pub mod row;
pub mod value;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use data_source::DataSource;
pub use entity::{Entity, EntityState};
pub use error::{OrmError, OrmResult};
pub use executor::{BindMode, Bindings, Connection, Executor, Params};
pub use monitor::{
    CompositeHook, CompositeMonitor, HookAction, InstrumentedExecutor, LoggingMonitor,
    MonitorConfig, NoopMonitor, QueryContext, QueryHook, QueryMonitor, QueryResult, QueryStats,
    QueryType, StatsMonitor,
};
pub use qb::{
    Arg, Condition, ConditionGroup, FindOptions, Having, JoinType, Operator, QueryBuilder, RawSql,
    UnknownOperator,
};
pub use repository::Repository;
pub use row::{FromRow, Row, RowSet};
pub use value::{FromValue, Value};

#[cfg(feature = "tracing-hook")]
pub use monitor::TracingSqlHook;

#[cfg(feature = "derive")]
pub use lightorm_derive::Entity;
