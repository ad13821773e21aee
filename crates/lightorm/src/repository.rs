//! Repository: find, save and delete for one entity kind.

use crate::entity::Entity;
use crate::error::OrmResult;
use crate::executor::{Bindings, Connection};
use crate::qb::{FindOptions, QueryBuilder};
use crate::row::Row;
use crate::value::Value;
use std::fmt;
use std::marker::PhantomData;

/// Maps rows of `E::TABLE` to and from `E` instances.
///
/// A repository holds only a connection handle; it caches nothing and every
/// call builds a fresh [`QueryBuilder`].
///
/// # Example
/// ```ignore
/// let users = ds.repository::<User>();
///
/// let mut user = User::create()?;
/// user.set("username", "alice");
/// users.save(&mut user)?;            // insert, id written back
///
/// let admins = users.find(
///     FindOptions::new().where_group(ConditionGroup::new().op("level", "ge", 9)),
/// )?;
/// ```
pub struct Repository<E> {
    connection: Connection,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("table", &E::TABLE)
            .field("primary_key", &E::PRIMARY_KEY)
            .finish()
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            _entity: PhantomData,
        }
    }

    pub fn table(&self) -> &'static str {
        E::TABLE
    }

    pub fn primary_key(&self) -> &'static str {
        E::PRIMARY_KEY
    }

    /// A builder targeting this repository's table.
    pub fn create_query_builder(&self, alias: Option<&str>) -> QueryBuilder {
        QueryBuilder::new(self.connection.clone(), E::TABLE, alias)
    }

    /// Hydrate one row. Failures are logged and dropped.
    fn hydrate(&self, row: Row) -> Option<E> {
        match E::instantiate(row, false) {
            Ok(entity) => Some(entity),
            Err(err) => {
                tracing::warn!(
                    table = E::TABLE,
                    error = %err,
                    "row skipped: entity construction failed"
                );
                None
            }
        }
    }

    /// Every entity matching `options`.
    ///
    /// Rows that fail to hydrate are skipped, so a short result does not
    /// imply fewer matching rows.
    pub fn find(&self, options: FindOptions) -> OrmResult<Vec<E>> {
        let rows = self
            .create_query_builder(None)
            .set_find_options(options)
            .get_many()?;
        Ok(rows.into_iter().filter_map(|row| self.hydrate(row)).collect())
    }

    /// The first entity matching `options`, or `None`.
    pub fn find_one(&self, options: FindOptions) -> OrmResult<Option<E>> {
        let row = self
            .create_query_builder(None)
            .set_find_options(options)
            .get_one()?;
        Ok(row.and_then(|row| self.hydrate(row)))
    }

    fn by_condition(&self, condition: &str, bindings: Bindings) -> QueryBuilder {
        let mut qb = self.create_query_builder(None).r#where(condition);
        qb.merge_bindings(bindings);
        qb
    }

    /// Entities matching a raw WHERE condition with named bindings.
    ///
    /// ```ignore
    /// let found = users.find_by(
    ///     "`username` = :name",
    ///     [("name".to_string(), Value::from("alice"))].into(),
    /// )?;
    /// ```
    pub fn find_by(&self, condition: &str, bindings: Bindings) -> OrmResult<Vec<E>> {
        let rows = self.by_condition(condition, bindings).get_many()?;
        Ok(rows.into_iter().filter_map(|row| self.hydrate(row)).collect())
    }

    /// The first entity matching a raw WHERE condition, or `None`.
    pub fn find_one_by(&self, condition: &str, bindings: Bindings) -> OrmResult<Option<E>> {
        let row = self.by_condition(condition, bindings).get_one()?;
        Ok(row.and_then(|row| self.hydrate(row)))
    }

    /// The stored primary key, or `0` when it is absent.
    fn primary_key_value(entity: &E) -> Value {
        match entity.get(E::PRIMARY_KEY) {
            Some(value) if !value.is_null() => value.clone(),
            _ => Value::Int(0),
        }
    }

    /// Persist pending changes.
    ///
    /// Does nothing when the entity is unmodified. A new entity is inserted
    /// and receives the generated key; a loaded one is updated by primary
    /// key. The modified set is cleared afterwards.
    pub fn save(&self, entity: &mut E) -> OrmResult<()> {
        if !entity.is_modified() {
            return Ok(());
        }

        let modified = entity.state().modified().clone();

        if entity.is_new() {
            let id = self.create_query_builder(None).insert(modified)?;
            tracing::debug!(table = E::TABLE, id = %id, "entity inserted");
            if !id.is_null() {
                entity.state_mut().set(E::PRIMARY_KEY, id);
            }
            entity.state_mut().mark_persisted();
        } else {
            let pk = Self::primary_key_value(entity);
            let affected = self
                .create_query_builder(None)
                .eq(E::PRIMARY_KEY, pk)
                .wrap()
                .update(modified)?;
            tracing::debug!(table = E::TABLE, affected, "entity updated");
        }

        entity.state_mut().clear_modified();
        Ok(())
    }

    /// Delete a persisted entity by primary key. New entities are ignored.
    pub fn delete(&self, entity: &E) -> OrmResult<()> {
        if entity.is_new() {
            return Ok(());
        }

        self.create_query_builder(None)
            .eq(E::PRIMARY_KEY, Self::primary_key_value(entity))
            .wrap()
            .delete()?;
        Ok(())
    }

    /// [`delete`](Self::delete) that accepts a missing entity.
    pub fn delete_opt(&self, entity: Option<&E>) -> OrmResult<()> {
        match entity {
            Some(entity) => self.delete(entity),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityState;
    use crate::error::OrmError;
    use crate::executor::Params;
    use crate::executor::testing::{RecordingExecutor, connection};
    use crate::row::RowSet;
    use crate::qb::ConditionGroup;

    #[derive(Debug)]
    struct User {
        state: EntityState,
    }

    impl Entity for User {
        const TABLE: &'static str = "users";
        const COLUMNS: &'static [&'static str] = &["id", "username", "level"];

        fn from_state(state: EntityState) -> OrmResult<Self> {
            if state.get("username") == Some(&Value::from("broken")) {
                return Err(OrmError::entity("cannot build user"));
            }
            Ok(Self { state })
        }

        fn state(&self) -> &EntityState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut EntityState {
            &mut self.state
        }
    }

    fn repo() -> (std::rc::Rc<RecordingExecutor>, Repository<User>) {
        let exec = RecordingExecutor::new();
        let repo = Repository::new(connection(&exec));
        (exec, repo)
    }

    #[test]
    fn test_save_new_inserts_once_and_writes_id() {
        let (exec, repo) = repo();
        exec.push(RowSet::affected(1).with_last_insert_id(42));

        let mut user = User::create().unwrap();
        user.set("username", "alice");
        repo.save(&mut user).unwrap();

        assert_eq!(exec.call_count(), 1);
        let (sql, params) = exec.last_call();
        assert_eq!(sql, "insert into `users` ( `username` ) values ( ? ) ;");
        assert_eq!(params, Params::Positional(vec![Value::from("alice")]));

        assert_eq!(user.get("id"), Some(&Value::Int(42)));
        assert!(!user.is_modified());
        assert!(!user.is_new());
    }

    #[test]
    fn test_save_unmodified_is_noop() {
        let (exec, repo) = repo();
        let mut user = User::instantiate(Row::new().with("id", 1), false).unwrap();
        repo.save(&mut user).unwrap();

        let mut fresh = User::create().unwrap();
        repo.save(&mut fresh).unwrap();

        assert_eq!(exec.call_count(), 0);
    }

    #[test]
    fn test_save_loaded_updates_by_primary_key() {
        let (exec, repo) = repo();
        let mut user = User::instantiate(Row::new().with("id", 7).with("level", 1), false).unwrap();
        user.set("level", 2);
        repo.save(&mut user).unwrap();

        let (sql, params) = exec.last_call();
        assert_eq!(
            sql,
            "update `users` set `level` = :level where (`id` = :placeholder0) ;"
        );
        let Params::Named(bindings) = params else {
            panic!("expected named params");
        };
        assert_eq!(bindings.get("placeholder0"), Some(&Value::Int(7)));
        assert_eq!(bindings.get("level"), Some(&Value::Int(2)));
        assert!(!user.is_modified());
    }

    #[test]
    fn test_save_loaded_without_key_targets_zero() {
        let (exec, repo) = repo();
        let mut user = User::instantiate(Row::new().with("level", 1), false).unwrap();
        user.set("level", 3);
        repo.save(&mut user).unwrap();

        let (_, params) = exec.last_call();
        let Params::Named(bindings) = params else {
            panic!("expected named params");
        };
        assert_eq!(bindings.get("placeholder0"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_delete_new_is_noop_persisted_is_scoped() {
        let (exec, repo) = repo();
        repo.delete(&User::create().unwrap()).unwrap();
        repo.delete_opt(None).unwrap();
        assert_eq!(exec.call_count(), 0);

        let user = User::instantiate(Row::new().with("id", 5), false).unwrap();
        repo.delete_opt(Some(&user)).unwrap();
        assert_eq!(exec.call_count(), 1);
        let (sql, params) = exec.last_call();
        assert_eq!(sql, "delete from `users` where (`id` = :placeholder0) ;");
        assert_eq!(
            params,
            Params::Named([("placeholder0".to_string(), Value::Int(5))].into())
        );
    }

    #[test]
    fn test_find_skips_rows_that_fail_to_hydrate() {
        // Callers cannot tell a dropped row from a non-matching one.
        let (exec, repo) = repo();
        exec.push_rows(vec![
            Row::new().with("id", 1).with("username", "alice"),
            Row::new().with("id", 2).with("username", "broken"),
            Row::new().with("id", 3).with("username", "carol"),
        ]);

        let users = repo
            .find(FindOptions::new().where_group(ConditionGroup::new().op("level", "ge", 1)))
            .unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| !u.is_new() && !u.is_modified()));

        let (sql, _) = exec.last_call();
        assert_eq!(sql, "select * from `users` where (`level` >= :placeholder0) ;");
    }

    #[test]
    fn test_find_one_none_on_zero_rows() {
        let (_, repo) = repo();
        assert!(repo.find_one(FindOptions::new()).unwrap().is_none());
    }

    #[test]
    fn test_find_by_raw_condition() {
        let (exec, repo) = repo();
        exec.push_rows(vec![Row::new().with("id", 9).with("username", "zed")]);

        let user = repo
            .find_one_by(
                "`username` = :name",
                [("name".to_string(), Value::from("zed"))].into(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(user.get("id"), Some(&Value::Int(9)));

        let (sql, params) = exec.last_call();
        assert_eq!(sql, "select * from `users` where `username` = :name ;");
        assert_eq!(
            params,
            Params::Named([("name".to_string(), Value::from("zed"))].into())
        );
    }

    #[test]
    fn test_store_errors_propagate() {
        struct Failing;
        impl crate::executor::Executor for Failing {
            fn execute(&self, _sql: &str, _params: &Params) -> OrmResult<RowSet> {
                Err(OrmError::query("disk full"))
            }
        }

        let repo: Repository<User> = Repository::new(Connection::new(Failing));
        let mut user = User::create().unwrap();
        user.set("username", "a");
        let err = repo.save(&mut user).unwrap_err();
        assert!(matches!(err, OrmError::Query(ref m) if m == "disk full"));
        assert!(user.is_modified());
    }
}
