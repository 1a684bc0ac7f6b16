//! Runner configuration.

use tracing::Level;

use crate::record::MAX_FLATTEN_DEPTH;

/// Configuration for [`QueryRunner`](crate::QueryRunner).
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum nesting of `#[orm(flatten)]` records.
    pub max_flatten_depth: usize,
    /// Whether to emit a `tracing` event for every statement sent to the client.
    pub log_sql: bool,
    /// Tracing event level for statement events.
    pub log_level: Level,
    /// Truncate logged SQL (in bytes, on a char boundary). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_flatten_depth: MAX_FLATTEN_DEPTH,
            log_sql: true,
            log_level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl RunnerConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum flatten depth.
    pub fn max_flatten_depth(mut self, depth: usize) -> Self {
        self.max_flatten_depth = depth;
        self
    }

    /// Enable or disable statement logging.
    pub fn log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    /// Override the tracing event level.
    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn display_sql<'s>(&self, sql: &'s str) -> std::borrow::Cow<'s, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => {
                let mut end = max;
                while end > 0 && !sql.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}...", &sql[..end]).into()
            }
            _ => sql.into(),
        }
    }
}
