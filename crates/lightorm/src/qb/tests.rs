//! Unit tests for the qb module.

use crate::executor::testing::{RecordingExecutor, connection};
use crate::executor::{Bindings, Params};
use crate::qb::{
    Arg, ConditionGroup, FindOptions, Having, JoinType, Operator, QueryBuilder, RawSql,
};
use crate::row::{Row, RowSet};
use crate::value::Value;
use std::rc::Rc;

fn qb(table: &str) -> (Rc<RecordingExecutor>, QueryBuilder) {
    let exec = RecordingExecutor::new();
    let qb = QueryBuilder::new(connection(&exec), table, None);
    (exec, qb)
}

fn bindings(pairs: &[(&str, Value)]) -> Bindings {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_select_basic() {
    let (_, qb) = qb("users");
    assert_eq!(qb.to_sql(), "select * from `users` ;");
}

#[test]
fn test_select_columns_alias_and_join() {
    let exec = RecordingExecutor::new();
    let qb = QueryBuilder::new(connection(&exec), "users", Some("u"))
        .select(["u.id", "p.title"])
        .left_join("posts", Some("p"), "p.user_id = u.id")
        .join("roles", None, "roles.id = u.role_id", JoinType::Inner);

    assert_eq!(
        qb.to_sql(),
        "select u.id, p.title from `users` as u left join `posts` as `p` on p.user_id = u.id \
         inner join `roles` on roles.id = u.role_id ;"
    );
}

#[test]
fn test_wrap_ands_staged_expressions() {
    let (_, qb) = qb("users");
    let qb = qb.eq("role", "admin").ge("level", 9);
    assert_eq!(qb.staged().len(), 2);

    let qb = qb.wrap();
    assert!(qb.staged().is_empty());
    assert_eq!(
        qb.to_sql(),
        "select * from `users` where (`role` = :placeholder0 and `level` >= :placeholder1) ;"
    );
    assert_eq!(
        qb.bindings(),
        &bindings(&[
            ("placeholder0", Value::from("admin")),
            ("placeholder1", Value::Int(9)),
        ])
    );
}

#[test]
fn test_wrap_or_prefixes_group() {
    let (_, qb) = qb("users");
    let sql = qb.eq("a", 1).wrap().lt("b", 2).wrap_or().to_sql();
    assert_eq!(
        sql,
        "select * from `users` where (`a` = :placeholder0) or (`b` < :placeholder1) ;"
    );
}

#[test]
fn test_wrap_without_staged_is_noop() {
    let (_, qb) = qb("users");
    let qb = qb.wrap().wrap_or();
    assert_eq!(qb.to_sql(), "select * from `users` ;");
}

#[test]
fn test_unary_operators_bind_nothing() {
    let (_, qb) = qb("users");
    let qb = qb.isnull("deleted_at").notnull("email").wrap();
    assert_eq!(
        qb.to_sql(),
        "select * from `users` where (`deleted_at` is null and `email` not null) ;"
    );
    assert!(qb.bindings().is_empty());
}

#[test]
fn test_raw_operand_is_inlined() {
    let (_, qb) = qb("users");
    let qb = qb
        .le("created_at", RawSql::new("CURRENT_TIMESTAMP"))
        .wrap();
    assert_eq!(
        qb.to_sql(),
        "select * from `users` where (`created_at` <= CURRENT_TIMESTAMP) ;"
    );
    assert!(qb.bindings().is_empty());
}

#[test]
fn test_null_operand_is_noop() {
    let (_, qb) = qb("users");
    let qb = qb
        .eq("a", None::<i64>)
        .apply_operator(Operator::NotEqual, "b", None);
    assert!(qb.staged().is_empty());
    assert!(qb.bindings().is_empty());
}

#[test]
fn test_unknown_operator_leaves_state_unchanged() {
    let (_, qb) = qb("users");
    let qb = qb.eq("a", 1).wrap();
    let before = qb.debug();

    let qb = qb.operator("between", "b", Some(Arg::from(3))).wrap();
    assert_eq!(qb.debug(), before);
}

#[test]
fn test_operator_by_tag() {
    let (_, qb) = qb("users");
    let sql = qb
        .operator("ne", "status", Some("banned".into()))
        .operator("isnull", "deleted_at", None)
        .wrap()
        .to_sql();
    assert_eq!(
        sql,
        "select * from `users` where (`status` != :placeholder0 and `deleted_at` is null) ;"
    );
}

#[test]
fn test_placeholders_never_collide() {
    let (_, qb) = qb("users");
    let qb = qb
        .bind_value("placeholder1", 100)
        .eq("a", 1)
        .eq("b", 2)
        .bind(Bindings::new())
        .eq("c", 3)
        .wrap();

    assert_eq!(
        qb.to_sql(),
        "select * from `users` where (`a` = :placeholder2 and `b` = :placeholder3 and `c` = :placeholder4) ;"
    );
    assert_eq!(qb.bindings().len(), 1);
}

#[test]
fn test_raw_where_fragments() {
    let (_, qb) = qb("users");
    let sql = qb
        .r#where("`a` = 1")
        .and_where("`b` = 2")
        .or_where("`c` = 3")
        .to_sql();
    assert_eq!(
        sql,
        "select * from `users` where `a` = 1 and `b` = 2 or `c` = 3 ;"
    );
}

#[test]
fn test_order_group_having_and_limit() {
    let (_, qb) = qb("users");
    let sql = qb
        .select(["role", "count(*) as n"])
        .order_by_desc("n")
        .order_by_asc("role")
        .group_by("role")
        .having("count(*) > 1")
        .and_having("role != 'x'")
        .offset(5)
        .take(10)
        .to_sql();
    assert_eq!(
        sql,
        "select role, count(*) as n from `users` order by n desc,role asc group by role \
         having count(*) > 1 and role != 'x' limit 5, 10 ;"
    );
}

#[test]
fn test_having_requires_group_by() {
    let (_, qb) = qb("users");
    let sql = qb.having("count(*) > 1").to_sql();
    assert_eq!(sql, "select * from `users` ;");
}

#[test]
fn test_offset_without_take() {
    let (_, qb) = qb("users");
    assert_eq!(qb.offset(20).to_sql(), "select * from `users` offset 20 ;");
}

#[test]
fn test_table_retarget() {
    let (_, qb) = qb("users");
    assert_eq!(
        qb.table("posts", Some("p")).to_sql(),
        "select * from `posts` as p ;"
    );
}

// ==================== find options ====================

#[test]
fn test_find_options_groups_are_ored() {
    let (_, qb) = qb("t");
    let qb = qb.set_find_options(
        FindOptions::new()
            .where_group(ConditionGroup::new().eq("a", 1))
            .where_group(ConditionGroup::new().eq("b", 2)),
    );
    assert_eq!(
        qb.to_sql(),
        "select * from `t` where (`a` = :placeholder0) or (`b` = :placeholder1) ;"
    );
    assert_eq!(
        qb.bindings(),
        &bindings(&[("placeholder0", Value::Int(1)), ("placeholder1", Value::Int(2))])
    );
}

#[test]
fn test_find_options_empty_leading_group_is_not_ored() {
    let (_, qb) = qb("t");
    let qb = qb.set_find_options(
        FindOptions::new()
            .where_group(ConditionGroup::new().eq("a", None::<i64>))
            .where_group(ConditionGroup::new().eq("b", 2))
            .where_group(ConditionGroup::new().eq("c", 3)),
    );
    assert_eq!(
        qb.to_sql(),
        "select * from `t` where (`b` = :placeholder0) or (`c` = :placeholder1) ;"
    );

    let opts = FindOptions::from_json(r#"{"where": [{"a": ["between", 1]}, {}, {"b": 2}]}"#)
        .unwrap();
    let (_, qb) = self::qb("t");
    assert_eq!(
        qb.set_find_options(opts).to_sql(),
        "select * from `t` where (`b` = :placeholder0) ;"
    );
}

#[test]
fn test_find_options_replace_and_append() {
    let (_, qb) = qb("users");
    let qb = qb
        .select(["old"])
        .r#where("`x` = 1")
        .group_by("old_group")
        .order_by_desc("created_at")
        .take(99)
        .offset(7)
        .set_find_options(
            FindOptions::new()
                .order_by("id", "asc")
                .group_by(["role"])
                .having(Having::Raw("count(*) > 2".into())),
        );

    assert_eq!(
        qb.to_sql(),
        "select * from `users` order by created_at desc,id asc group by role having count(*) > 2 ;"
    );
}

#[test]
fn test_find_options_having_bindings_merge() {
    let (_, qb) = qb("users");
    let qb = qb.set_find_options(
        FindOptions::new()
            .group_by(["role"])
            .having(Having::WithBindings(
                "count(*) > :min".into(),
                bindings(&[("min", Value::Int(3))]),
            )),
    );
    assert_eq!(qb.bindings().get("min"), Some(&Value::Int(3)));
}

#[test]
fn test_find_options_from_json_matches_builder() {
    let json = r#"{
        "select": ["id", "username"],
        "where": [{"username": "admin", "level": ["ge", 9]}, {"deleted_at": ["isnull"]}],
        "orderBy": {"username": "asc", "id": "desc"},
        "take": 10,
        "offset": 20
    }"#;
    let from_json = FindOptions::from_json(json).unwrap();

    let built = FindOptions::new()
        .select(["id", "username"])
        .where_group(ConditionGroup::new().eq("username", "admin").op("level", "ge", 9))
        .where_group(ConditionGroup::new().unary("deleted_at", "isnull"))
        .order_by("username", "asc")
        .order_by("id", "desc")
        .take(10)
        .offset(20);

    let (_, a) = qb("users");
    let (_, b) = qb("users");
    let a = a.set_find_options(from_json);
    let b = b.set_find_options(built);

    assert_eq!(a.debug(), b.debug());
    assert_eq!(
        a.to_sql(),
        "select id, username from `users` where (`username` = :placeholder0 and `level` >= :placeholder1) \
         or (`deleted_at` is null) order by username asc,id desc limit 20, 10 ;"
    );
}

#[test]
fn test_find_options_json_having_pair() {
    let opts = FindOptions::from_json(
        r#"{"groupBy": ["role"], "having": ["count(*) > :min", {"min": 2}]}"#,
    )
    .unwrap();
    let (_, qb) = qb("users");
    let qb = qb.set_find_options(opts);
    assert_eq!(
        qb.to_sql(),
        "select * from `users` group by role having count(*) > :min ;"
    );
    assert_eq!(qb.bindings().get("min"), Some(&Value::Int(2)));
}

#[test]
fn test_find_options_json_rejects_bad_shape() {
    let err = FindOptions::from_json(r#"{"where": [{"a": []}]}"#).unwrap_err();
    assert!(matches!(err, crate::OrmError::Serialization(_)));
}

// ==================== materializers ====================

#[test]
fn test_get_many_uses_named_mode() {
    let (exec, qb) = qb("users");
    exec.push_rows(vec![Row::new().with("id", 1), Row::new().with("id", 2)]);

    let rows = qb.eq("id", 1).wrap().get_many().unwrap();
    assert_eq!(rows.len(), 2);

    let (sql, params) = exec.last_call();
    assert_eq!(sql, "select * from `users` where (`id` = :placeholder0) ;");
    assert_eq!(
        params,
        Params::Named(bindings(&[("placeholder0", Value::Int(1))]))
    );
}

#[test]
fn test_get_one_returns_first_or_none() {
    let (exec, qb) = qb("users");
    exec.push_rows(vec![Row::new().with("id", 7), Row::new().with("id", 8)]);
    let row = qb.get_one().unwrap().unwrap();
    assert_eq!(row.get("id"), Some(&Value::Int(7)));

    assert!(qb.get_one().unwrap().is_none());
}

#[test]
fn test_count_is_literal_row_count() {
    let (exec, qb) = qb("users");
    exec.push_rows(vec![Row::new().with("n", 42)]);
    assert_eq!(qb.select(["count(*) as n"]).count().unwrap(), 1);
}

#[test]
fn test_insert_renders_positional() {
    let (exec, qb) = qb("t");
    exec.push(RowSet::affected(1).with_last_insert_id(11));

    let id = qb.insert([("x", 5)]).unwrap();
    assert_eq!(id, Value::Int(11));

    let (sql, params) = exec.last_call();
    assert_eq!(sql, "insert into `t` ( `x` ) values ( ? ) ;");
    assert_eq!(params, Params::Positional(vec![Value::Int(5)]));
}

#[test]
fn test_insert_inlines_raw_values() {
    let (exec, qb) = qb("t");
    let id = qb
        .insert([
            ("name", Arg::from("a")),
            ("created_at", RawSql::new("CURRENT_TIMESTAMP").into()),
        ])
        .unwrap();
    assert_eq!(id, Value::Null);

    let (sql, params) = exec.last_call();
    assert_eq!(
        sql,
        "insert into `t` ( `name`, `created_at` ) values ( ?, CURRENT_TIMESTAMP ) ;"
    );
    assert_eq!(params, Params::Positional(vec![Value::from("a")]));
}

#[test]
fn test_update_binds_by_column_name() {
    let (exec, qb) = qb("users");
    exec.push(RowSet::affected(3));

    let mut qb = qb.eq("id", 1).wrap();
    let affected = qb
        .update([
            ("status", Arg::from("inactive")),
            ("updated_at", RawSql::new("CURRENT_TIMESTAMP").into()),
        ])
        .unwrap();
    assert_eq!(affected, 3);

    let (sql, params) = exec.last_call();
    assert_eq!(
        sql,
        "update `users` set `status` = :status, `updated_at` = CURRENT_TIMESTAMP \
         where (`id` = :placeholder0) ;"
    );
    assert_eq!(
        params,
        Params::Named(bindings(&[
            ("placeholder0", Value::Int(1)),
            ("status", Value::from("inactive")),
        ]))
    );
}

#[test]
fn test_empty_writes_are_rejected_before_execution() {
    let (exec, mut qb) = qb("users");
    assert!(qb.update(Vec::<(&str, i64)>::new()).unwrap_err().is_validation());
    assert!(qb.insert(Vec::<(&str, i64)>::new()).unwrap_err().is_validation());
    assert_eq!(exec.call_count(), 0);
}

#[test]
fn test_delete_returns_builder() {
    let (exec, qb) = qb("users");
    let qb = qb.eq("id", 4).wrap().delete().unwrap();
    assert_eq!(qb.table_name(), "users");

    let (sql, _) = exec.last_call();
    assert_eq!(sql, "delete from `users` where (`id` = :placeholder0) ;");
}
