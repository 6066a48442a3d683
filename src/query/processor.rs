use std::fmt;

use serde_json::Value;

/// Extracts the entry list from a decoded search response.
pub trait Processor: fmt::Debug + Send + Sync {
    fn process_select(&self, results: Value) -> Vec<Value>;
}

/// Treats the body itself as the entries: an array is the entry list, any
/// other value is one entry, `null` is none.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScimProcessor;

impl Processor for ScimProcessor {
    fn process_select(&self, results: Value) -> Vec<Value> {
        wrap(results)
    }
}

/// Unwraps PingDirectory's `_embedded.entries` envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingDirectoryProcessor;

impl PingDirectoryProcessor {
    pub const ENTRIES_POINTER: &'static str = "/_embedded/entries";
}

impl Processor for PingDirectoryProcessor {
    fn process_select(&self, mut results: Value) -> Vec<Value> {
        let entries = results
            .pointer_mut(Self::ENTRIES_POINTER)
            .map(Value::take)
            .unwrap_or(Value::Null);
        wrap(entries)
    }
}

fn wrap(value: Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(entries) => entries,
        other => vec![other],
    }
}
