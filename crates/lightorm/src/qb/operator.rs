//! Comparison operators and operator arguments.

use crate::value::Value;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Comparison operator understood by the query builder.
///
/// Each operator has a short mnemonic tag (`eq`, `ge`, `isnull`, ...) used by
/// [`QueryBuilder::operator`](crate::QueryBuilder::operator) and by find options.
///
/// # Example
/// ```
/// use lightorm::Operator;
///
/// assert_eq!(Operator::from_tag("ge"), Some(Operator::GreaterOrEqual));
/// assert_eq!(Operator::GreaterOrEqual.sql(), ">=");
/// assert_eq!(Operator::from_tag("like"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterOrEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessOrEqual,
    /// `not null`
    NotNull,
    /// `is null`
    IsNull,
}

impl Operator {
    /// Every operator, in tag-table order.
    pub const ALL: [Operator; 8] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::GreaterThan,
        Operator::GreaterOrEqual,
        Operator::LessThan,
        Operator::LessOrEqual,
        Operator::NotNull,
        Operator::IsNull,
    ];

    /// Look up an operator by mnemonic. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.tag() == tag)
    }

    /// The mnemonic tag.
    pub fn tag(self) -> &'static str {
        match self {
            Operator::Equal => "eq",
            Operator::NotEqual => "ne",
            Operator::GreaterThan => "gt",
            Operator::GreaterOrEqual => "ge",
            Operator::LessThan => "lt",
            Operator::LessOrEqual => "le",
            Operator::NotNull => "notnull",
            Operator::IsNull => "isnull",
        }
    }

    /// The SQL text rendered between the field and the operand.
    pub fn sql(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessOrEqual => "<=",
            Operator::NotNull => "not null",
            Operator::IsNull => "is null",
        }
    }

    /// Unary operators take no operand and never bind.
    pub fn is_unary(self) -> bool {
        matches!(self, Operator::NotNull | Operator::IsNull)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// Error returned when parsing an unknown operator tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperator(pub String);

impl fmt::Display for UnknownOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operator `{}`", self.0)
    }
}

impl std::error::Error for UnknownOperator {}

impl FromStr for Operator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| UnknownOperator(s.to_string()))
    }
}

/// A deferred raw-SQL producer.
///
/// Used wherever a value may be replaced by an SQL expression: the produced
/// text is inlined verbatim and nothing is bound. Never feed it user input.
///
/// # Example
/// ```
/// use lightorm::RawSql;
///
/// let now = RawSql::new("CURRENT_TIMESTAMP");
/// assert_eq!(now.produce(), "CURRENT_TIMESTAMP");
///
/// let sub = RawSql::from_fn(|| format!("(select max(`id`) from `{}`)", "users"));
/// assert_eq!(sub.produce(), "(select max(`id`) from `users`)");
/// ```
#[derive(Clone)]
pub struct RawSql(Rc<dyn Fn() -> String>);

impl RawSql {
    /// A producer returning fixed SQL text.
    pub fn new(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        RawSql(Rc::new(move || sql.clone()))
    }

    /// A producer evaluated each time the fragment is rendered.
    pub fn from_fn<F: Fn() -> String + 'static>(f: F) -> Self {
        RawSql(Rc::new(f))
    }

    /// Produce the SQL text.
    pub fn produce(&self) -> String {
        (self.0)()
    }
}

impl fmt::Debug for RawSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawSql").field(&self.produce()).finish()
    }
}

/// Right-hand side of an operator or a write column.
#[derive(Debug, Clone)]
pub enum Arg {
    /// A value bound through a placeholder.
    Value(Value),
    /// Raw SQL inlined into the statement.
    Raw(RawSql),
}

impl From<RawSql> for Arg {
    fn from(raw: RawSql) -> Self {
        Arg::Raw(raw)
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<&Value> for Arg {
    fn from(value: &Value) -> Self {
        Arg::Value(value.clone())
    }
}

macro_rules! impl_arg_from_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Arg {
                fn from(v: $t) -> Self {
                    Arg::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_arg_from_value!(
    bool, i8, i16, i32, i64, u8, u16, u32, f32, f64, &str, String, &String, Vec<u8>
);

impl<T: Into<Value>> From<Option<T>> for Arg {
    fn from(v: Option<T>) -> Self {
        Arg::Value(v.map_or(Value::Null, Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_table_round_trips() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_tag(op.tag()), Some(op));
        }
        assert_eq!(Operator::NotNull.sql(), "not null");
        assert_eq!(Operator::IsNull.sql(), "is null");
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(Operator::from_tag("between"), None);
        let err = "EQ".parse::<Operator>().unwrap_err();
        assert_eq!(err.to_string(), "unknown operator `EQ`");
    }

    #[test]
    fn test_raw_sql_is_deferred() {
        use std::cell::Cell;
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let raw = RawSql::from_fn(move || {
            counter.set(counter.get() + 1);
            "now()".to_string()
        });
        assert_eq!(calls.get(), 0);
        assert_eq!(raw.produce(), "now()");
        assert_eq!(calls.get(), 1);
    }
}
