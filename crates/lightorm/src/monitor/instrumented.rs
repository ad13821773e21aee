use super::config::MonitorConfig;
use super::monitors::{CompositeHook, NoopMonitor};
use super::types::{HookAction, QueryContext, QueryHook, QueryMonitor, QueryResult, QueryType};
use crate::error::{OrmError, OrmResult};
use crate::executor::{Executor, Params};
use crate::row::RowSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Wraps an [`Executor`] with hooks and monitors.
///
/// Hooks always run. Monitors only receive events once monitoring is
/// enabled in the [`MonitorConfig`].
///
/// # Example
/// ```ignore
/// let stats = Rc::new(StatsMonitor::new());
/// let exec = InstrumentedExecutor::new(rusqlite::Connection::open_in_memory()?)
///     .with_config(MonitorConfig::new().enable_monitoring())
///     .with_monitor(stats.clone())
///     .add_hook(TracingSqlHook::new());
/// let ds = DataSource::new(exec);
/// ```
pub struct InstrumentedExecutor<E> {
    inner: E,
    monitor: Rc<dyn QueryMonitor>,
    hook: Option<Rc<dyn QueryHook>>,
    config: MonitorConfig,
    tag: Option<String>,
}

impl<E: Executor> InstrumentedExecutor<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            monitor: Rc::new(NoopMonitor),
            hook: None,
            config: MonitorConfig::default(),
            tag: None,
        }
    }

    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_monitor<M: QueryMonitor + 'static>(mut self, monitor: M) -> Self {
        self.monitor = Rc::new(monitor);
        self
    }

    /// Replace any hook with `hook`.
    pub fn with_hook<H: QueryHook + 'static>(mut self, hook: H) -> Self {
        self.hook = Some(Rc::new(hook));
        self
    }

    /// Add a hook after any existing one.
    pub fn add_hook<H: QueryHook + 'static>(mut self, hook: H) -> Self {
        let hook: Rc<dyn QueryHook> = Rc::new(hook);
        self.hook = Some(match self.hook.take() {
            None => hook,
            Some(existing) => Rc::new(CompositeHook::new().add_rc(existing).add_rc(hook)),
        });
        self
    }

    /// Label every statement's context with `tag`.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn enable_monitoring(mut self) -> Self {
        self.config.monitoring_enabled = true;
        self
    }

    pub fn is_monitoring_enabled(&self) -> bool {
        self.config.monitoring_enabled
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }

    fn apply_hook(&self, ctx: &mut QueryContext) -> OrmResult<()> {
        let Some(hook) = &self.hook else {
            return Ok(());
        };

        match hook.before_query(ctx) {
            HookAction::Continue => Ok(()),
            HookAction::ModifySql(sql) => {
                ctx.query_type = QueryType::from_sql(&sql);
                ctx.exec_sql = sql;
                Ok(())
            }
            HookAction::Abort(reason) => Err(OrmError::validation(format!(
                "query aborted by hook: {reason}"
            ))),
        }
    }

    fn report(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        if let Some(hook) = &self.hook {
            hook.after_query(ctx, duration, result);
        }

        if !self.config.monitoring_enabled {
            return;
        }

        self.monitor.on_query_complete(ctx, duration, result);

        if self.config.is_slow(duration) {
            self.monitor.on_slow_query(ctx, duration);
        }
    }
}

impl<E: Executor> Executor for InstrumentedExecutor<E> {
    fn execute(&self, sql: &str, params: &Params) -> OrmResult<RowSet> {
        let mut ctx = QueryContext::new(sql, params.len(), params.mode());
        ctx.tag = self.tag.clone();

        self.apply_hook(&mut ctx)?;

        if self.config.monitoring_enabled {
            self.monitor.on_query_start(&ctx);
        }

        let start = Instant::now();
        let result = self.inner.execute(&ctx.exec_sql, params);
        let duration = start.elapsed();

        let outcome = match &result {
            Ok(set) if set.rows.is_empty() && ctx.query_type != QueryType::Select => {
                QueryResult::Affected(set.row_count)
            }
            Ok(set) => QueryResult::Rows(set.rows.len()),
            Err(e) => QueryResult::error(e.to_string()),
        };

        self.report(&ctx, duration, &outcome);
        result
    }
}
