use std::time::Duration;

/// Settings for [`InstrumentedExecutor`](super::InstrumentedExecutor).
///
/// The default leaves monitors silent and has no slow-query threshold.
/// Hooks run either way.
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    /// `on_slow_query` fires for statements that take longer than this.
    pub slow_query_threshold: Option<Duration>,
    /// Whether monitors receive events.
    pub monitoring_enabled: bool,
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slow_query_threshold(self, threshold: Duration) -> Self {
        MonitorConfig {
            slow_query_threshold: Some(threshold),
            ..self
        }
    }

    pub fn enable_monitoring(self) -> Self {
        MonitorConfig {
            monitoring_enabled: true,
            ..self
        }
    }

    pub fn disable_monitoring(self) -> Self {
        MonitorConfig {
            monitoring_enabled: false,
            ..self
        }
    }

    pub(crate) fn is_slow(&self, elapsed: Duration) -> bool {
        matches!(self.slow_query_threshold, Some(limit) if elapsed > limit)
    }
}
