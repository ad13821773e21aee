//! Fluent query builder (QB) for lightorm.
//!
//! A [`QueryBuilder`] collects clause fragments and named bindings for one
//! statement, renders it in a backtick-quoted dialect and hands it to the
//! connection's executor.
//!
//! # Features
//!
//! - **Staged operators**: `eq`, `ge`, `isnull`, ... collect expressions that
//!   `wrap` / `wrap_or` turn into AND-ed WHERE groups
//! - **Automatic placeholders**: every bound value gets a fresh `:placeholderN`
//! - **Raw SQL escape hatch**: [`RawSql`] inlines an expression without binding
//! - **Find options**: a small structured DSL (also accepted as JSON)
//!
//! # Usage
//!
//! ```ignore
//! use lightorm::{DataSource, RawSql};
//!
//! let ds = DataSource::sqlite_in_memory()?;
//!
//! // SELECT
//! let admins = ds
//!     .create_query_builder("users", None)
//!     .eq("role", "admin")
//!     .ge("level", 9)
//!     .wrap()
//!     .order_by_desc("id")
//!     .take(20)
//!     .get_many()?;
//!
//! // INSERT
//! let id = ds
//!     .create_query_builder("users", None)
//!     .insert([("username", "alice".into()), ("created_at", RawSql::new("CURRENT_TIMESTAMP").into())])?;
//!
//! // UPDATE
//! ds.create_query_builder("users", None)
//!     .eq("id", id)
//!     .wrap()
//!     .update([("status", "inactive")])?;
//! ```

mod builder;
mod find_options;
mod operator;

pub use builder::{JoinType, QueryBuilder};
pub use find_options::{Condition, ConditionGroup, FindOptions, Having};
pub use operator::{Arg, Operator, RawSql, UnknownOperator};

#[cfg(test)]
mod tests;
