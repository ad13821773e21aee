//! Convenient imports for typical `lightorm` usage.
//!
//! ```ignore
//! use lightorm::prelude::*;
//! ```

pub use crate::{
    Bindings, ConditionGroup, DataSource, Entity, EntityState, FindOptions, Having, OrmError,
    OrmResult, Params, QueryBuilder, RawSql, Repository, Row, Value,
};
