use super::truncate_sql_bytes;
use super::types::{HookAction, QueryContext, QueryHook, QueryMonitor, QueryResult, QueryType};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

impl<M: QueryMonitor + ?Sized> QueryMonitor for Rc<M> {
    fn on_query_start(&self, ctx: &QueryContext) {
        M::on_query_start(self, ctx)
    }

    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        M::on_query_complete(self, ctx, duration, result)
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        M::on_slow_query(self, ctx, duration)
    }
}

impl<H: QueryHook + ?Sized> QueryHook for Rc<H> {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        H::before_query(self, ctx)
    }

    fn after_query(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        H::after_query(self, ctx, duration, result)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl QueryMonitor for NoopMonitor {
    fn on_query_complete(&self, _: &QueryContext, _: Duration, _: &QueryResult) {}
}

/// Emits one `tracing` event per statement (target `lightorm.sql`).
///
/// Completed statements log at `info`, failures and slow statements at `warn`.
#[derive(Debug, Clone)]
pub struct LoggingMonitor {
    /// Skip statements faster than this.
    pub min_duration: Option<Duration>,
    /// Truncate SQL longer than this many bytes.
    pub max_sql_length: Option<usize>,
}

impl Default for LoggingMonitor {
    fn default() -> Self {
        LoggingMonitor {
            min_duration: None,
            max_sql_length: Some(200),
        }
    }
}

impl LoggingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only log statements that took at least `duration`.
    pub fn min_duration(self, duration: Duration) -> Self {
        LoggingMonitor {
            min_duration: Some(duration),
            ..self
        }
    }

    pub fn max_sql_length(self, len: usize) -> Self {
        LoggingMonitor {
            max_sql_length: Some(len),
            ..self
        }
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => {
                let mut cut = truncate_sql_bytes(sql, max).to_string();
                cut.push_str("...");
                cut
            }
            _ => sql.to_string(),
        }
    }
}

impl QueryMonitor for LoggingMonitor {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        if matches!(self.min_duration, Some(min) if duration < min) {
            return;
        }

        let sql = self.truncate_sql(&ctx.exec_sql);
        let tag = ctx.tag.as_deref().unwrap_or("-");
        match result {
            QueryResult::Error(message) => tracing::warn!(
                target: "lightorm.sql",
                kind = ?ctx.query_type,
                bind_mode = ?ctx.bind_mode,
                tag,
                ?duration,
                error = %message,
                sql = %sql,
                "statement failed"
            ),
            outcome => tracing::info!(
                target: "lightorm.sql",
                kind = ?ctx.query_type,
                bind_mode = ?ctx.bind_mode,
                tag,
                ?duration,
                outcome = %outcome,
                sql = %sql,
                "statement finished"
            ),
        }
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        let sql = self.truncate_sql(&ctx.exec_sql);
        tracing::warn!(
            target: "lightorm.sql",
            kind = ?ctx.query_type,
            ?duration,
            sql = %sql,
            "slow statement"
        );
    }
}

/// Counters collected by [`StatsMonitor`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStats {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub slow_queries: u64,
    pub select_count: u64,
    pub insert_count: u64,
    pub update_count: u64,
    pub delete_count: u64,
    /// Rows returned by statements that produce rows.
    pub rows_read: u64,
    /// Rows changed by writes.
    pub rows_written: u64,
    pub total_duration: Duration,
    pub max_duration: Duration,
    /// Executed SQL of the slowest statement seen so far.
    pub slowest_query: Option<String>,
}

impl QueryStats {
    /// Mean statement duration, zero before the first statement.
    pub fn average_duration(&self) -> Duration {
        u32::try_from(self.total_queries)
            .ok()
            .filter(|n| *n > 0)
            .map_or(Duration::ZERO, |n| self.total_duration / n)
    }

    fn record(&mut self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        self.total_queries += 1;
        self.total_duration = self.total_duration.saturating_add(duration);

        let counter = match ctx.query_type {
            QueryType::Select => Some(&mut self.select_count),
            QueryType::Insert => Some(&mut self.insert_count),
            QueryType::Update => Some(&mut self.update_count),
            QueryType::Delete => Some(&mut self.delete_count),
            QueryType::Other => None,
        };
        if let Some(counter) = counter {
            *counter += 1;
        }

        match result {
            QueryResult::Rows(n) => self.rows_read += *n as u64,
            QueryResult::Affected(n) => self.rows_written += n,
            QueryResult::Error(_) => self.failed_queries += 1,
        }

        if duration > self.max_duration {
            self.max_duration = duration;
            self.slowest_query = Some(ctx.exec_sql.clone());
        }
    }
}

/// Aggregates [`QueryStats`] in place.
///
/// Keep an `Rc` to it so the numbers stay readable while it is installed.
#[derive(Debug, Default)]
pub struct StatsMonitor {
    stats: RefCell<QueryStats>,
}

impl StatsMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current counters.
    pub fn stats(&self) -> QueryStats {
        self.stats.borrow().clone()
    }

    pub fn reset(&self) {
        self.stats.replace(QueryStats::default());
    }
}

impl QueryMonitor for StatsMonitor {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        self.stats.borrow_mut().record(ctx, duration, result);
    }

    fn on_slow_query(&self, _: &QueryContext, _: Duration) {
        self.stats.borrow_mut().slow_queries += 1;
    }
}

/// Forwards every event to each monitor, in insertion order.
#[derive(Default)]
pub struct CompositeMonitor {
    monitors: Vec<Rc<dyn QueryMonitor>>,
}

impl CompositeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add<M: QueryMonitor + 'static>(self, monitor: M) -> Self {
        self.add_rc(Rc::new(monitor))
    }

    /// Add a monitor that is also held elsewhere.
    pub fn add_rc(mut self, monitor: Rc<dyn QueryMonitor>) -> Self {
        self.monitors.push(monitor);
        self
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl QueryMonitor for CompositeMonitor {
    fn on_query_start(&self, ctx: &QueryContext) {
        self.monitors.iter().for_each(|m| m.on_query_start(ctx));
    }

    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        self.monitors
            .iter()
            .for_each(|m| m.on_query_complete(ctx, duration, result));
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        self.monitors
            .iter()
            .for_each(|m| m.on_slow_query(ctx, duration));
    }
}

/// Runs hooks in insertion order.
///
/// Each hook sees the SQL left by the previous rewrite. The first `Abort`
/// stops the chain.
#[derive(Default)]
pub struct CompositeHook {
    hooks: Vec<Rc<dyn QueryHook>>,
}

impl CompositeHook {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add<H: QueryHook + 'static>(self, hook: H) -> Self {
        self.add_rc(Rc::new(hook))
    }

    pub fn add_rc(mut self, hook: Rc<dyn QueryHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl QueryHook for CompositeHook {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        let mut rewritten: Option<QueryContext> = None;
        for hook in &self.hooks {
            let seen = rewritten.as_ref().unwrap_or(ctx);
            match hook.before_query(seen) {
                HookAction::Continue => {}
                HookAction::ModifySql(sql) => {
                    let mut next = seen.clone();
                    next.query_type = QueryType::from_sql(&sql);
                    next.exec_sql = sql;
                    rewritten = Some(next);
                }
                abort @ HookAction::Abort(_) => return abort,
            }
        }

        match rewritten {
            Some(next) if next.exec_sql != ctx.exec_sql => HookAction::ModifySql(next.exec_sql),
            _ => HookAction::Continue,
        }
    }

    fn after_query(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        for hook in &self.hooks {
            hook.after_query(ctx, duration, result);
        }
    }
}
