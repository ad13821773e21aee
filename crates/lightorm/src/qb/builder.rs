//! The fluent query builder.

use crate::error::{OrmError, OrmResult};
use crate::executor::{Bindings, Connection, Params};
use crate::qb::operator::{Arg, Operator};
use crate::row::{FromRow, Row, RowSet};
use crate::value::Value;

/// Join flavour for [`QueryBuilder::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    /// `left join`
    #[default]
    Left,
    /// `inner join`
    Inner,
    /// `right join`
    Right,
}

impl JoinType {
    fn sql(self) -> &'static str {
        match self {
            JoinType::Left => "left",
            JoinType::Inner => "inner",
            JoinType::Right => "right",
        }
    }
}

/// Accumulates clause fragments and bindings for a single statement.
///
/// Fluent methods consume and return the builder. Materializers (`get_many`,
/// `get_one`, `count`, `insert`, `update`, `delete`) render the statement and
/// hand it to the connection's executor.
///
/// Operator calls (`eq`, `ge`, `isnull`, ...) are *staged*: they only reach
/// the WHERE clause once grouped with [`wrap`](Self::wrap) or
/// [`wrap_or`](Self::wrap_or).
///
/// A builder is meant for one statement; create a fresh one per query.
///
/// # Example
/// ```ignore
/// let row = ds
///     .create_query_builder("users", None)
///     .select(["username"])
///     .eq("id", 1)
///     .wrap()
///     .get_one()?;
/// ```
#[derive(Clone, Debug)]
pub struct QueryBuilder {
    connection: Connection,
    table: String,
    alias: Option<String>,
    select: Vec<String>,
    joins: Vec<String>,
    wheres: Vec<String>,
    expressions: Vec<String>,
    order_by: Vec<String>,
    group_by: Vec<String>,
    having: Vec<String>,
    offset: u64,
    take: u64,
    bindings: Bindings,
    /// Next candidate for `placeholderN`; never decreases.
    next_placeholder: usize,
}

impl QueryBuilder {
    /// Create a builder for `table` (optionally aliased).
    pub fn new(connection: Connection, table: impl Into<String>, alias: Option<&str>) -> Self {
        Self {
            connection,
            table: table.into(),
            alias: alias.map(str::to_string),
            select: Vec::new(),
            joins: Vec::new(),
            wheres: Vec::new(),
            expressions: Vec::new(),
            order_by: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            offset: 0,
            take: 0,
            bindings: Bindings::new(),
            next_placeholder: 0,
        }
    }

    // ==================== Target & projection ====================

    /// Retarget the builder at another table.
    pub fn table(mut self, table: impl Into<String>, alias: Option<&str>) -> Self {
        self.table = table.into();
        self.alias = alias.map(str::to_string);
        self
    }

    /// Replace the select list. An empty list renders as `*`.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Append one select expression.
    pub fn add_select(mut self, column: impl Into<String>) -> Self {
        self.select.push(column.into());
        self
    }

    // ==================== JOIN ====================

    /// Add a join clause: `<type> join `table` [as `alias`] on <condition>`.
    ///
    /// The condition is raw SQL and is not parsed.
    pub fn join(
        mut self,
        table: &str,
        alias: Option<&str>,
        condition: &str,
        join_type: JoinType,
    ) -> Self {
        let clause = match alias {
            Some(alias) => format!(
                "{} join `{}` as `{}` on {}",
                join_type.sql(),
                table,
                alias,
                condition
            ),
            None => format!("{} join `{}` on {}", join_type.sql(), table, condition),
        };
        self.joins.push(clause);
        self
    }

    /// Add a LEFT JOIN.
    pub fn left_join(self, table: &str, alias: Option<&str>, condition: &str) -> Self {
        self.join(table, alias, condition, JoinType::Left)
    }

    /// Add an INNER JOIN.
    pub fn inner_join(self, table: &str, alias: Option<&str>, condition: &str) -> Self {
        self.join(table, alias, condition, JoinType::Inner)
    }

    /// Add a RIGHT JOIN.
    pub fn right_join(self, table: &str, alias: Option<&str>, condition: &str) -> Self {
        self.join(table, alias, condition, JoinType::Right)
    }

    // ==================== Operators ====================

    /// Stage `` `field` <op> <value> ``.
    ///
    /// - unary operators (`notnull`, `isnull`) ignore `value` and bind nothing;
    /// - [`Arg::Raw`] inlines the produced SQL and binds nothing;
    /// - [`Arg::Value`] allocates a fresh `:placeholderN` and binds the value;
    /// - a missing or NULL value on a binary operator stages nothing.
    pub fn apply_operator(mut self, op: Operator, field: &str, value: Option<Arg>) -> Self {
        let fragment = if op.is_unary() {
            format!("`{}` {}", field, op.sql())
        } else {
            match value {
                Some(Arg::Raw(raw)) => format!("`{}` {} {}", field, op.sql(), raw.produce()),
                Some(Arg::Value(value)) if !value.is_null() => {
                    let placeholder = self.allocate_placeholder();
                    self.bindings.insert(placeholder.clone(), value);
                    format!("`{}` {} :{}", field, op.sql(), placeholder)
                }
                _ => {
                    tracing::trace!(field, op = op.tag(), "operator without value skipped");
                    return self;
                }
            }
        };
        self.expressions.push(fragment);
        self
    }

    /// Stage an operator by mnemonic tag (`eq`, `ne`, `gt`, `ge`, `lt`, `le`,
    /// `notnull`, `isnull`).
    ///
    /// An unknown tag is swallowed: it is logged and the builder is unchanged.
    pub fn operator(self, tag: &str, field: &str, value: Option<Arg>) -> Self {
        match Operator::from_tag(tag) {
            Some(op) => self.apply_operator(op, field, value),
            None => {
                tracing::warn!(tag, field, "unknown operator ignored");
                self
            }
        }
    }

    /// Stage `` `field` = :placeholderN ``.
    pub fn eq(self, field: &str, value: impl Into<Arg>) -> Self {
        self.apply_operator(Operator::Equal, field, Some(value.into()))
    }

    /// Stage `` `field` != :placeholderN ``.
    pub fn ne(self, field: &str, value: impl Into<Arg>) -> Self {
        self.apply_operator(Operator::NotEqual, field, Some(value.into()))
    }

    /// Stage `` `field` > :placeholderN ``.
    pub fn gt(self, field: &str, value: impl Into<Arg>) -> Self {
        self.apply_operator(Operator::GreaterThan, field, Some(value.into()))
    }

    /// Stage `` `field` >= :placeholderN ``.
    pub fn ge(self, field: &str, value: impl Into<Arg>) -> Self {
        self.apply_operator(Operator::GreaterOrEqual, field, Some(value.into()))
    }

    /// Stage `` `field` < :placeholderN ``.
    pub fn lt(self, field: &str, value: impl Into<Arg>) -> Self {
        self.apply_operator(Operator::LessThan, field, Some(value.into()))
    }

    /// Stage `` `field` <= :placeholderN ``.
    pub fn le(self, field: &str, value: impl Into<Arg>) -> Self {
        self.apply_operator(Operator::LessOrEqual, field, Some(value.into()))
    }

    /// Stage `` `field` not null ``.
    pub fn notnull(self, field: &str) -> Self {
        self.apply_operator(Operator::NotNull, field, None)
    }

    /// Stage `` `field` is null ``.
    pub fn isnull(self, field: &str) -> Self {
        self.apply_operator(Operator::IsNull, field, None)
    }

    /// Stage a raw boolean fragment alongside operator expressions.
    pub fn add_expression(mut self, expression: impl Into<String>) -> Self {
        self.expressions.push(expression.into());
        self
    }

    fn allocate_placeholder(&mut self) -> String {
        let mut n = self.next_placeholder.max(self.bindings.len());
        let mut name = format!("placeholder{n}");
        while self.bindings.contains_key(&name) {
            n += 1;
            name = format!("placeholder{n}");
        }
        self.next_placeholder = n + 1;
        name
    }

    // ==================== WHERE ====================

    /// Move staged expressions into WHERE as `(e1 and e2 ...)`.
    ///
    /// Nothing is appended when no expressions are staged.
    pub fn wrap(mut self) -> Self {
        if let Some(group) = self.take_group() {
            self.wheres.push(group);
        }
        self
    }

    /// Move staged expressions into WHERE as `or (e1 and e2 ...)`.
    pub fn wrap_or(mut self) -> Self {
        if let Some(group) = self.take_group() {
            self.wheres.push(format!("or {group}"));
        }
        self
    }

    fn take_group(&mut self) -> Option<String> {
        if self.expressions.is_empty() {
            tracing::debug!(table = %self.table, "wrap called with no staged expressions");
            return None;
        }
        let group = format!("({})", self.expressions.join(" and "));
        self.expressions.clear();
        Some(group)
    }

    /// Append a raw WHERE fragment verbatim.
    pub fn r#where(mut self, condition: impl Into<String>) -> Self {
        self.wheres.push(condition.into());
        self
    }

    /// Append `and <condition>` to WHERE.
    pub fn and_where(mut self, condition: &str) -> Self {
        self.wheres.push(format!("and {condition}"));
        self
    }

    /// Append `or <condition>` to WHERE.
    pub fn or_where(mut self, condition: &str) -> Self {
        self.wheres.push(format!("or {condition}"));
        self
    }

    // ==================== ORDER / GROUP / HAVING ====================

    /// Append `<field> <order>` to ORDER BY.
    pub fn order_by(mut self, field: &str, order: &str) -> Self {
        self.order_by.push(format!("{field} {order}"));
        self
    }

    /// Append `<field> desc` to ORDER BY.
    pub fn order_by_desc(self, field: &str) -> Self {
        self.order_by(field, "desc")
    }

    /// Append `<field> asc` to ORDER BY.
    pub fn order_by_asc(self, field: &str) -> Self {
        self.order_by(field, "asc")
    }

    /// Append a GROUP BY expression.
    pub fn group_by(mut self, expression: impl Into<String>) -> Self {
        self.group_by.push(expression.into());
        self
    }

    /// Append a raw HAVING fragment. Only rendered when GROUP BY is set.
    pub fn having(mut self, condition: impl Into<String>) -> Self {
        self.having.push(condition.into());
        self
    }

    /// Append `and <condition>` to HAVING.
    pub fn and_having(mut self, condition: &str) -> Self {
        self.having.push(format!("and {condition}"));
        self
    }

    /// Append `or <condition>` to HAVING.
    pub fn or_having(mut self, condition: &str) -> Self {
        self.having.push(format!("or {condition}"));
        self
    }

    // ==================== Pagination ====================

    /// Rows to skip.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Maximum rows to return; `0` means no limit.
    pub fn take(mut self, take: u64) -> Self {
        self.take = take;
        self
    }

    // ==================== Bindings ====================

    /// Replace every binding.
    pub fn bind(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Add (or overwrite) a single named binding.
    pub fn bind_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    /// Current bindings.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Expressions staged but not yet wrapped.
    pub fn staged(&self) -> &[String] {
        &self.expressions
    }

    /// Target table name.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    // Crate-internal mutators used by find-options translation.

    pub(crate) fn replace_select(&mut self, select: Vec<String>) {
        self.select = select;
    }

    pub(crate) fn has_where(&self) -> bool {
        !self.wheres.is_empty()
    }

    pub(crate) fn reset_where(&mut self) {
        self.wheres.clear();
    }

    pub(crate) fn replace_group_by(&mut self, group_by: Vec<String>) {
        self.group_by = group_by;
    }

    pub(crate) fn push_having(&mut self, condition: String) {
        self.having.push(condition);
    }

    pub(crate) fn merge_bindings(&mut self, bindings: Bindings) {
        self.bindings.extend(bindings);
    }

    pub(crate) fn set_page(&mut self, take: u64, offset: u64) {
        self.take = take;
        self.offset = offset;
    }

    // ==================== Rendering ====================

    fn table_sql(&self) -> String {
        format!("`{}`", self.table)
    }

    fn where_sql(&self) -> Option<String> {
        (!self.wheres.is_empty()).then(|| self.wheres.join(" "))
    }

    /// Render the SELECT statement.
    ///
    /// HAVING is only rendered together with a non-empty GROUP BY.
    pub fn prepare_query(&self) -> String {
        let mut chunks: Vec<String> = vec!["select".into()];

        chunks.push(if self.select.is_empty() {
            "*".into()
        } else {
            self.select.join(", ")
        });

        chunks.push("from".into());
        chunks.push(match &self.alias {
            Some(alias) => format!("{} as {}", self.table_sql(), alias),
            None => self.table_sql(),
        });

        if !self.joins.is_empty() {
            chunks.push(self.joins.join(" "));
        }

        if let Some(where_sql) = self.where_sql() {
            chunks.push("where".into());
            chunks.push(where_sql);
        }

        if !self.order_by.is_empty() {
            chunks.push("order by".into());
            chunks.push(self.order_by.join(","));
        }

        if !self.group_by.is_empty() {
            chunks.push("group by".into());
            chunks.push(self.group_by.join(","));

            if !self.having.is_empty() {
                chunks.push("having".into());
                chunks.push(self.having.join(" "));
            }
        }

        if self.take > 0 {
            chunks.push("limit".into());
            chunks.push(format!("{}, {}", self.offset, self.take));
        } else if self.offset > 0 {
            chunks.push("offset".into());
            chunks.push(self.offset.to_string());
        }

        chunks.push(";".into());
        chunks.join(" ")
    }

    /// Alias for [`prepare_query`](Self::prepare_query).
    pub fn to_sql(&self) -> String {
        self.prepare_query()
    }

    /// The rendered SELECT and its bindings.
    pub fn debug(&self) -> (String, Bindings) {
        (self.prepare_query(), self.bindings.clone())
    }

    // ==================== Execution ====================

    fn run(&self, kind: &'static str, sql: &str, params: &Params) -> OrmResult<RowSet> {
        tracing::debug!(
            target: "lightorm.sql",
            kind,
            table = %self.table,
            sql = %sql,
            param_count = params.len(),
            "QueryBuilder executing"
        );
        self.connection.execute_native_query(sql, params)
    }

    fn named_params(&self) -> Params {
        Params::Named(self.bindings.clone())
    }

    /// Execute the SELECT and return every row.
    pub fn get_many(&self) -> OrmResult<Vec<Row>> {
        let sql = self.prepare_query();
        Ok(self.run("select", &sql, &self.named_params())?.rows)
    }

    /// Execute the SELECT and map every row with [`FromRow`].
    pub fn get_many_as<T: FromRow>(&self) -> OrmResult<Vec<T>> {
        self.get_many()?.iter().map(T::from_row).collect()
    }

    /// Execute the SELECT and return the first row, or `None` for no rows.
    pub fn get_one(&self) -> OrmResult<Option<Row>> {
        let sql = self.prepare_query();
        let set = self.run("select", &sql, &self.named_params())?;
        if set.row_count >= 1 {
            Ok(set.rows.into_iter().next())
        } else {
            Ok(None)
        }
    }

    /// Execute the SELECT as built and return its row count.
    ///
    /// This is the number of rows the statement produced, not a
    /// `count(*)` rewrite.
    pub fn count(&self) -> OrmResult<u64> {
        let sql = self.prepare_query();
        Ok(self.run("select", &sql, &self.named_params())?.row_count)
    }

    /// Execute `update `table` set ... [where ...] ;` and return the
    /// affected row count.
    ///
    /// Plain values render as `` `key` = :key `` and are bound under `key`,
    /// overwriting any binding of that name. Raw values are inlined.
    pub fn update<I, K, V>(&mut self, data: I) -> OrmResult<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Arg>,
    {
        let mut assignments = Vec::new();
        for (key, value) in data {
            let key = key.into();
            match value.into() {
                Arg::Raw(raw) => assignments.push(format!("`{}` = {}", key, raw.produce())),
                Arg::Value(value) => {
                    assignments.push(format!("`{}` = :{}", key, key));
                    self.bindings.insert(key, value);
                }
            }
        }

        if assignments.is_empty() {
            return Err(OrmError::validation(format!(
                "update on `{}` requires at least one column",
                self.table
            )));
        }

        let mut chunks = vec![
            "update".to_string(),
            self.table_sql(),
            "set".to_string(),
            assignments.join(", "),
        ];
        if let Some(where_sql) = self.where_sql() {
            chunks.push("where".into());
            chunks.push(where_sql);
        }
        chunks.push(";".into());

        let sql = chunks.join(" ");
        Ok(self.run("update", &sql, &self.named_params())?.row_count)
    }

    /// Execute `insert into `table` ( ... ) values ( ... ) ;` with
    /// positional parameters and return the generated key.
    ///
    /// Raw values are inlined into the VALUES list. Returns
    /// [`Value::Null`] when the executor reports no insert id.
    pub fn insert<I, K, V>(&self, data: I) -> OrmResult<Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Arg>,
    {
        let mut columns = Vec::new();
        let mut slots = Vec::new();
        let mut values = Vec::new();

        for (key, value) in data {
            columns.push(format!("`{}`", key.into()));
            match value.into() {
                Arg::Raw(raw) => slots.push(raw.produce()),
                Arg::Value(value) => {
                    slots.push("?".to_string());
                    values.push(value);
                }
            }
        }

        if columns.is_empty() {
            return Err(OrmError::validation(format!(
                "insert into `{}` requires at least one column",
                self.table
            )));
        }

        let sql = format!(
            "insert into {} ( {} ) values ( {} ) ;",
            self.table_sql(),
            columns.join(", "),
            slots.join(", ")
        );

        let set = self.run("insert", &sql, &Params::Positional(values))?;
        Ok(set.last_insert_id.unwrap_or(Value::Null))
    }

    /// Execute `delete from `table` [where ...] ;` and hand the builder back.
    pub fn delete(self) -> OrmResult<Self> {
        let mut chunks = vec!["delete from".to_string(), self.table_sql()];
        if let Some(where_sql) = self.where_sql() {
            chunks.push("where".into());
            chunks.push(where_sql);
        }
        chunks.push(";".into());

        let sql = chunks.join(" ");
        self.run("delete", &sql, &self.named_params())?;
        Ok(self)
    }
}
