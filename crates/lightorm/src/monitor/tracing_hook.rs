use super::truncate_sql_bytes;
use super::types::{HookAction, QueryContext, QueryHook};
use std::borrow::Cow;
use tracing::Level;

/// Hook that logs each statement through `tracing` as it is about to run.
///
/// It never changes or blocks a statement. Because hooks run regardless of
/// [`MonitorConfig`](super::MonitorConfig), this logs even with monitoring
/// off. Needs the `tracing-hook` feature (default).
#[derive(Debug, Clone)]
pub struct TracingSqlHook {
    /// Level of the emitted event.
    pub level: Level,
    /// SQL longer than this many bytes is cut. `None` keeps it whole.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingSqlHook {
    fn default() -> Self {
        TracingSqlHook {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl TracingSqlHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(self, level: Level) -> Self {
        TracingSqlHook { level, ..self }
    }

    pub fn max_sql_length(self, len: usize) -> Self {
        TracingSqlHook {
            max_sql_length: Some(len),
            ..self
        }
    }

    pub fn no_truncate(self) -> Self {
        TracingSqlHook {
            max_sql_length: None,
            ..self
        }
    }

    pub(crate) fn truncate_sql<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => {
                Cow::Owned(format!("{}...", truncate_sql_bytes(sql, max)))
            }
            _ => Cow::Borrowed(sql),
        }
    }
}

// `tracing` macros need the level at compile time.
macro_rules! event_at {
    ($level:expr, $($rest:tt)*) => {
        match $level {
            Level::TRACE => tracing::trace!($($rest)*),
            Level::DEBUG => tracing::debug!($($rest)*),
            Level::INFO => tracing::info!($($rest)*),
            Level::WARN => tracing::warn!($($rest)*),
            Level::ERROR => tracing::error!($($rest)*),
        }
    };
}

impl QueryHook for TracingSqlHook {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        let sql = self.truncate_sql(&ctx.exec_sql);
        event_at!(
            self.level,
            target: "lightorm.sql",
            kind = ?ctx.query_type,
            bind_mode = ?ctx.bind_mode,
            params = ctx.param_count,
            tag = ctx.tag.as_deref().unwrap_or("-"),
            rewritten = ctx.sql != ctx.exec_sql,
            fields = ?ctx.fields,
            sql = %sql,
            "executing statement"
        );
        HookAction::Continue
    }
}
