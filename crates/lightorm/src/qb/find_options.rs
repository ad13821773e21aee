//! Structured find options and their translation into builder calls.

use crate::error::OrmResult;
use crate::executor::Bindings;
use crate::qb::builder::QueryBuilder;
use crate::qb::operator::{Arg, Operator};
use crate::value::Value;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use std::fmt;
use std::marker::PhantomData;

/// Right-hand side of one field in a [`ConditionGroup`].
#[derive(Debug, Clone)]
pub enum Condition {
    /// A bare value, compared with `eq`.
    Value(Arg),
    /// An operator tag with an optional operand (`["ge", 9]`, `["isnull"]`).
    Op(String, Option<Arg>),
}

impl From<Arg> for Condition {
    fn from(arg: Arg) -> Self {
        Condition::Value(arg)
    }
}

/// Fields AND-ed together into one parenthesized WHERE group.
///
/// Insertion order is kept; it decides placeholder numbering.
#[derive(Debug, Clone, Default)]
pub struct ConditionGroup {
    conditions: Vec<(String, Condition)>,
}

impl ConditionGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `field = value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Arg>) -> Self {
        self.conditions
            .push((field.into(), Condition::Value(value.into())));
        self
    }

    /// Add `field <op> value` by operator tag.
    pub fn op(mut self, field: impl Into<String>, tag: &str, value: impl Into<Arg>) -> Self {
        self.conditions.push((
            field.into(),
            Condition::Op(tag.to_string(), Some(value.into())),
        ));
        self
    }

    /// Add a unary operator (`notnull`, `isnull`) by tag.
    pub fn unary(mut self, field: impl Into<String>, tag: &str) -> Self {
        self.conditions
            .push((field.into(), Condition::Op(tag.to_string(), None)));
        self
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl IntoIterator for ConditionGroup {
    type Item = (String, Condition);
    type IntoIter = std::vec::IntoIter<(String, Condition)>;

    fn into_iter(self) -> Self::IntoIter {
        self.conditions.into_iter()
    }
}

/// Collect `field = value` pairs into one group.
impl<K: Into<String>, V: Into<Arg>> FromIterator<(K, V)> for ConditionGroup {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            conditions: iter
                .into_iter()
                .map(|(k, v)| (k.into(), Condition::Value(v.into())))
                .collect(),
        }
    }
}

/// HAVING fragment carried by find options.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum Having {
    /// Raw condition text.
    Raw(String),
    /// Condition text plus bindings merged into the builder.
    WithBindings(String, Bindings),
}

/// The find-options mini language.
///
/// Applying options replaces select, where, group by, take and offset; order
/// by and having are appended to whatever the builder already holds.
///
/// # Example
/// ```
/// use lightorm::{ConditionGroup, FindOptions};
///
/// let opts = FindOptions::new()
///     .select(["id", "username"])
///     .where_group(ConditionGroup::new().eq("username", "admin"))
///     .where_group(ConditionGroup::new().op("level", "ge", 9))
///     .order_by("id", "desc")
///     .take(10);
/// assert_eq!(opts.where_groups().len(), 2);
///
/// let json: FindOptions = serde_json::from_str(
///     r#"{"where":[{"username":"admin"},{"level":["ge",9]}],"orderBy":{"id":"desc"},"take":10}"#,
/// ).unwrap();
/// assert_eq!(json.where_groups().len(), 2);
/// ```
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FindOptions {
    select: Vec<String>,
    #[serde(rename = "where")]
    where_groups: Vec<ConditionGroup>,
    #[serde(deserialize_with = "deserialize_ordered_map")]
    order_by: Vec<(String, String)>,
    group_by: Vec<String>,
    having: Option<Having>,
    take: u64,
    offset: u64,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a group; groups after the first are OR-ed.
    pub fn where_group(mut self, group: ConditionGroup) -> Self {
        self.where_groups.push(group);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: impl Into<String>) -> Self {
        self.order_by.push((field.into(), direction.into()));
        self
    }

    pub fn group_by<I, S>(mut self, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = expressions.into_iter().map(Into::into).collect();
        self
    }

    pub fn having(mut self, having: Having) -> Self {
        self.having = Some(having);
        self
    }

    pub fn take(mut self, take: u64) -> Self {
        self.take = take;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn where_groups(&self) -> &[ConditionGroup] {
        &self.where_groups
    }

    /// Parse options from their JSON form.
    pub fn from_json(json: &str) -> OrmResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl QueryBuilder {
    /// Apply find options.
    ///
    /// Every group is staged field by field and then wrapped: the first with
    /// [`wrap`](Self::wrap), the rest with [`wrap_or`](Self::wrap_or).
    pub fn set_find_options(mut self, options: FindOptions) -> Self {
        let FindOptions {
            select,
            where_groups,
            order_by,
            group_by,
            having,
            take,
            offset,
        } = options;

        self.replace_select(select);
        self.reset_where();

        // Groups that stage nothing are skipped, so only a group that follows
        // an emitted one is or'd.
        for group in where_groups {
            for (field, condition) in group {
                self = match condition {
                    Condition::Value(arg) => {
                        self.apply_operator(Operator::Equal, &field, Some(arg))
                    }
                    Condition::Op(tag, arg) => self.operator(&tag, &field, arg),
                };
            }
            self = if self.has_where() { self.wrap_or() } else { self.wrap() };
        }

        for (field, direction) in order_by {
            self = self.order_by(&field, &direction);
        }

        self.replace_group_by(group_by);

        match having {
            Some(Having::Raw(condition)) => self.push_having(condition),
            Some(Having::WithBindings(condition, bindings)) => {
                self.push_having(condition);
                self.merge_bindings(bindings);
            }
            None => {}
        }

        self.set_page(take, offset);
        self
    }
}

// ==================== serde ====================

/// Collects a map into `(key, value)` pairs in document order.
struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = Vec<(String, V)>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, V>()? {
            out.push((key, value));
        }
        Ok(out)
    }
}

fn deserialize_ordered_map<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
}

impl<'de> Deserialize<'de> for ConditionGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self {
            conditions: deserialize_ordered_map(deserializer)?,
        })
    }
}

struct ConditionVisitor;

impl ConditionVisitor {
    fn value<E>(value: Value) -> Result<Condition, E> {
        Ok(Condition::Value(Arg::Value(value)))
    }
}

impl<'de> Visitor<'de> for ConditionVisitor {
    type Value = Condition;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar or an [operator, value] pair")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Condition, E> {
        Self::value(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Condition, E> {
        Self::value(Value::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Condition, E> {
        Self::value(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Condition, E> {
        Self::value(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Condition, E> {
        let v = i64::try_from(v)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &"an i64"))?;
        Self::value(Value::Int(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Condition, E> {
        Self::value(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Condition, E> {
        Self::value(Value::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Condition, E> {
        Self::value(Value::Text(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Condition, A::Error> {
        let tag: String = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let operand: Option<Value> = seq.next_element()?;
        Ok(Condition::Op(tag, operand.map(Arg::Value)))
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ConditionVisitor)
    }
}
