//! Statement monitoring and hooks.
//!
//! Wrap any executor in an [`InstrumentedExecutor`] to time statements, log
//! them, collect statistics or rewrite/veto SQL before it runs.
//!
//! # Example
//!
//! ```rust,ignore
//! use lightorm::monitor::{InstrumentedExecutor, LoggingMonitor, MonitorConfig};
//! use std::time::Duration;
//!
//! let config = MonitorConfig::new()
//!     .with_slow_query_threshold(Duration::from_millis(50))
//!     .enable_monitoring();
//!
//! let exec = InstrumentedExecutor::new(rusqlite::Connection::open_in_memory()?)
//!     .with_config(config)
//!     .with_monitor(LoggingMonitor::new());
//! let ds = lightorm::DataSource::new(exec);
//! ```

mod config;
mod instrumented;
mod monitors;
mod types;

#[cfg(feature = "tracing-hook")]
mod tracing_hook;


pub use config::MonitorConfig;
pub use instrumented::InstrumentedExecutor;
pub use monitors::{
    CompositeHook, CompositeMonitor, LoggingMonitor, NoopMonitor, QueryStats, StatsMonitor,
};
pub use types::{HookAction, QueryContext, QueryHook, QueryMonitor, QueryResult, QueryType};

#[cfg(feature = "tracing-hook")]
pub use tracing_hook::TracingSqlHook;

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
