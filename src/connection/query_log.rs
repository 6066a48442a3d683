use serde::Serialize;

use crate::query::CompiledQuery;

/// A query executed (or pretended) by a connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedQuery {
    pub query: CompiledQuery,
    /// Wall time in milliseconds, rounded to two decimals.
    pub time_ms: f64,
}

/// In-memory record of executed queries. Disabled by default.
#[derive(Debug, Default)]
pub struct QueryLog {
    enabled: bool,
    entries: Vec<LoggedQuery>,
}

impl QueryLog {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Appends an entry when logging is enabled.
    pub fn record(&mut self, query: &CompiledQuery, time_ms: f64) {
        if self.enabled {
            self.entries.push(LoggedQuery {
                query: query.clone(),
                time_ms: (time_ms * 100.0).round() / 100.0,
            });
        }
    }

    pub fn entries(&self) -> &[LoggedQuery] {
        &self.entries
    }

    pub fn flush(&mut self) {
        self.entries.clear();
    }

    /// Swaps in a new entry list, returning the old one.
    pub(crate) fn replace(&mut self, entries: Vec<LoggedQuery>) -> Vec<LoggedQuery> {
        std::mem::replace(&mut self.entries, entries)
    }
}
