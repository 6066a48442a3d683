//! In-memory transport for connection and cursor tests.

use std::{collections::VecDeque, ops::Range};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use super::{Transport, TransportError};
use crate::query::CompiledQuery;

/// A transport that replays queued responses and records every request.
///
/// Once the queue is empty it answers with `null`.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
    requests: Mutex<Vec<CompiledQuery>>,
}

impl MockTransport {
    pub fn new(responses: impl IntoIterator<Item = Result<Value, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<CompiledQuery> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, query: &CompiledQuery) -> Result<Value, TransportError> {
        self.requests.lock().push(query.clone());
        self.responses.lock().pop_front().unwrap_or(Ok(Value::Null))
    }
}

/// A PingDirectory-style page holding one `{"uid": n}` entry per `n`.
pub fn ping_page(uids: Range<u64>, cursor: Option<&str>) -> Value {
    let entries: Vec<Value> = uids.map(|uid| json!({ "uid": uid })).collect();
    let mut page = json!({
        "size": entries.len(),
        "_embedded": { "entries": entries },
    });
    if let Some(cursor) = cursor {
        page["_links"] = json!({ "next": { "data": { "cursor": cursor } } });
    }
    page
}
