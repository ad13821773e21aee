use crate::executor::BindMode;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Statement kind, detected from the leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    /// DDL, pragmas and anything else.
    Other,
}

fn starts_with_keyword(sql: &str, keyword: &str) -> bool {
    let sql = sql.trim_start();
    sql.len() >= keyword.len()
        && sql.as_bytes()[..keyword.len()].eq_ignore_ascii_case(keyword.as_bytes())
        && sql[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_ascii_alphanumeric() && c != '_')
}

impl QueryType {
    /// Detect the statement kind. Case-insensitive.
    ///
    /// For `with ...` statements the keyword after the last top-level
    /// parenthesised CTE body decides.
    pub fn from_sql(sql: &str) -> Self {
        Self::from_keyword(sql).unwrap_or_else(|| {
            if starts_with_keyword(sql, "with") {
                Self::from_keyword(Self::after_ctes(sql)).unwrap_or(QueryType::Select)
            } else {
                QueryType::Other
            }
        })
    }

    fn from_keyword(sql: &str) -> Option<Self> {
        [
            ("select", QueryType::Select),
            ("insert", QueryType::Insert),
            ("update", QueryType::Update),
            ("delete", QueryType::Delete),
        ]
        .into_iter()
        .find(|(keyword, _)| starts_with_keyword(sql, keyword))
        .map(|(_, kind)| kind)
    }

    fn after_ctes(sql: &str) -> &str {
        let mut depth = 0i32;
        let mut in_string = false;
        let mut end = 0;
        for (i, c) in sql.char_indices() {
            match c {
                '\'' => in_string = !in_string,
                '(' if !in_string => depth += 1,
                ')' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        end = i + 1;
                    }
                }
                _ => {}
            }
        }
        &sql[end..]
    }
}

/// What an instrumented executor knows about one statement.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// SQL as handed to the executor.
    pub sql: String,
    /// SQL actually executed, after hooks.
    pub exec_sql: String,
    pub param_count: usize,
    pub bind_mode: BindMode,
    pub query_type: QueryType,
    /// Optional label set by the instrumented executor.
    pub tag: Option<String>,
    /// Low-cardinality structured fields.
    pub fields: BTreeMap<String, String>,
}

impl QueryContext {
    pub fn new(sql: &str, param_count: usize, bind_mode: BindMode) -> Self {
        Self {
            sql: sql.to_string(),
            exec_sql: sql.to_string(),
            param_count,
            bind_mode,
            query_type: QueryType::from_sql(sql),
            tag: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

const MAX_ERROR_LEN: usize = 512;

/// Outcome of one statement, as reported to monitors.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// The statement returned rows.
    Rows(usize),
    /// The statement changed rows.
    Affected(u64),
    /// The statement failed; message truncated to 512 bytes.
    Error(String),
}

impl QueryResult {
    pub fn error(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.len() > MAX_ERROR_LEN {
            Self::Error(format!("{}...", super::truncate_sql_bytes(&msg, MAX_ERROR_LEN)))
        } else {
            Self::Error(msg)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryResult::Error(_))
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Rows(n) => write!(f, "{n} rows"),
            QueryResult::Affected(n) => write!(f, "{n} affected"),
            QueryResult::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Receives timing and outcome events for executed statements.
pub trait QueryMonitor {
    fn on_query_start(&self, _ctx: &QueryContext) {}

    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult);

    /// Called after `on_query_complete` when the slow-query threshold is
    /// exceeded.
    fn on_slow_query(&self, _ctx: &QueryContext, _duration: Duration) {}
}

/// Decision returned by [`QueryHook::before_query`].
#[derive(Debug, Clone, PartialEq)]
pub enum HookAction {
    Continue,
    /// Execute this SQL instead.
    ModifySql(String),
    /// Refuse to execute; surfaces as a validation error.
    Abort(String),
}

/// Inspects, rewrites or vetoes statements before they run.
pub trait QueryHook {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        let _ = ctx;
        HookAction::Continue
    }

    /// Called for every finished statement, before monitors, whether or not
    /// monitoring is enabled.
    fn after_query(&self, _ctx: &QueryContext, _duration: Duration, _result: &QueryResult) {}
}
