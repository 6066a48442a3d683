//! Lazy multi-page retrieval.
//!
//! A [`PageCursor`] requests one page at a time, hands out its entries, and
//! asks for the next page only once the current one is drained. Paging stops
//! when the directory omits the continuation token or when the number of
//! entries seen exceeds the budget `max(page_size, limit)`.

use std::collections::VecDeque;

use futures::Stream;
use serde_json::Value;

use super::{Connection, ConnectionError, ConnectionResult};
use crate::query::CompiledQuery;

/// Pull-based iterator over the entries of a paged search.
///
/// Only one request is in flight at a time. Dropping the cursor abandons the
/// search; there is no way to resume it part way.
#[derive(Debug)]
pub struct PageCursor {
    connection: Connection,
    query: CompiledQuery,
    page_size: u32,
    budget: u64,
    token: Option<String>,
    seen: u64,
    pages: usize,
    buffer: VecDeque<Value>,
    done: bool,
}

impl PageCursor {
    pub(crate) fn new(connection: Connection, query: CompiledQuery, limit: u32) -> Self {
        let page_size = connection.pagination().page_size;
        Self {
            connection,
            query,
            page_size,
            budget: u64::from(page_size.max(limit)),
            token: None,
            seen: 0,
            pages: 0,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Total entries this cursor may page through before it stops asking
    /// for more.
    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Pages requested so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// The next entry, fetching a new page if the current one is drained.
    ///
    /// A failed page request is yielded once; the cursor then ends.
    pub async fn next_entry(&mut self) -> Option<ConnectionResult<Value>> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.fetch_page().await {
                self.done = true;
                tracing::debug!(
                    connection = %self.connection.name(),
                    page = self.pages,
                    error = %e,
                    "Cursor stopped on error"
                );
                return Some(Err(e));
            }
        }
    }

    async fn fetch_page(&mut self) -> ConnectionResult<()> {
        let request = self.query.page(self.page_size, self.token.as_deref());
        let response = self.connection.run(&request).await?;
        self.pages += 1;

        let pagination = self.connection.pagination();
        let token = continuation_token(&response, &pagination.cursor_pointer)?;
        let size = page_size_field(&response, &pagination.size_pointer);
        let entries = self.connection.processor().process_select(response);

        self.seen += size.unwrap_or(entries.len() as u64);
        self.done = token.is_none() || self.seen > self.budget;

        tracing::debug!(
            connection = %self.connection.name(),
            page = self.pages,
            entries = entries.len(),
            seen = self.seen,
            budget = self.budget,
            has_more = token.is_some(),
            "Fetched directory page"
        );
        if self.done {
            tracing::debug!(
                connection = %self.connection.name(),
                pages = self.pages,
                reason = if token.is_none() { "no continuation token" } else { "budget exceeded" },
                "Cursor finished"
            );
        }

        self.token = token;
        self.buffer.extend(entries);
        Ok(())
    }

    /// Drains the cursor, stopping at the first error.
    pub async fn try_collect(mut self) -> ConnectionResult<Vec<Value>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry().await {
            entries.push(entry?);
        }
        Ok(entries)
    }

    /// Adapts the cursor into a [`Stream`] of entries.
    pub fn into_stream(self) -> impl Stream<Item = ConnectionResult<Value>> {
        futures::stream::unfold(self, |mut cursor| async move {
            cursor.next_entry().await.map(|entry| (entry, cursor))
        })
    }
}

/// Reads the continuation token. Numbers and booleans are taken as their
/// text; `null` or a missing field ends paging.
fn continuation_token(response: &Value, pointer: &str) -> ConnectionResult<Option<String>> {
    if pointer.is_empty() {
        return Ok(None);
    }
    match response.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(token)) => Ok(Some(token.clone())),
        Some(token @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(token.to_string())),
        Some(other) => Err(ConnectionError::InvalidResponse(format!(
            "continuation token at '{pointer}' is not a scalar: {other}"
        ))),
    }
}

fn page_size_field(response: &Value, pointer: &str) -> Option<u64> {
    if pointer.is_empty() {
        return None;
    }
    response.pointer(pointer).and_then(Value::as_u64)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::{
        config::{PaginationConfig, Provider},
        connection::test_utils::{MockTransport, ping_page},
    };

    fn connection(transport: Arc<MockTransport>) -> Connection {
        Connection::new(
            "test",
            transport,
            Provider::PingDirectory,
            PaginationConfig::default(),
        )
    }

    #[test]
    fn test_continuation_token() {
        let pointer = "/_links/next/data/cursor";
        assert_eq!(
            continuation_token(&json!({"_links": {"next": {"data": {"cursor": "X"}}}}), pointer)
                .unwrap(),
            Some("X".to_string())
        );
        assert_eq!(
            continuation_token(&json!({"_links": {"next": {"data": {"cursor": 42}}}}), pointer)
                .unwrap(),
            Some("42".to_string())
        );
        assert_eq!(continuation_token(&json!({"size": 1}), pointer).unwrap(), None);
        assert_eq!(
            continuation_token(&json!({"_links": {"next": null}}), pointer).unwrap(),
            None
        );
        assert_eq!(continuation_token(&json!({"a": 1}), "").unwrap(), None);
        assert!(matches!(
            continuation_token(&json!({"_links": {"next": {"data": {"cursor": []}}}}), pointer),
            Err(ConnectionError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_two_pages_yield_all_entries_in_order() {
        let transport = Arc::new(MockTransport::new([
            Ok(ping_page(0..100, Some("X"))),
            Ok(ping_page(100..110, None)),
        ]));
        let conn = connection(transport.clone());
        let mut query = conn.query();
        query.where_present("uid");

        let mut cursor = query.cursor(&conn);
        let mut uids = Vec::new();
        while let Some(entry) = cursor.next_entry().await {
            uids.push(entry.unwrap()["uid"].as_u64().unwrap());
        }

        assert_eq!(uids, (0..110).collect::<Vec<_>>());
        assert_eq!(cursor.pages_fetched(), 2);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].cursor, None);
        assert_eq!(requests[0].limit, Some(100));
        assert_eq!(requests[0].filter, "uid pr");
        assert_eq!(requests[1].cursor.as_deref(), Some("X"));
        assert_eq!(requests[1].limit, Some(100));
    }

    #[tokio::test]
    async fn test_second_page_is_fetched_only_on_demand() {
        let transport = Arc::new(MockTransport::new([
            Ok(ping_page(0..2, Some("X"))),
            Ok(ping_page(2..3, None)),
        ]));
        let conn = connection(transport.clone());
        let mut cursor = conn.cursor(conn.query().to_scim(), 100);

        cursor.next_entry().await.unwrap().unwrap();
        cursor.next_entry().await.unwrap().unwrap();
        assert_eq!(transport.requests().len(), 1);

        cursor.next_entry().await.unwrap().unwrap();
        assert_eq!(transport.requests().len(), 2);
        assert!(cursor.next_entry().await.is_none());
    }

    #[tokio::test]
    async fn test_budget_stops_paging() {
        let transport = Arc::new(MockTransport::new([
            Ok(ping_page(0..100, Some("X"))),
            Ok(ping_page(100..200, Some("Y"))),
            Ok(ping_page(200..300, Some("Z"))),
        ]));
        let conn = connection(transport.clone());
        let cursor = conn.cursor(conn.query().to_scim(), 150);
        assert_eq!(cursor.budget(), 150);

        let entries = cursor.try_collect().await.unwrap();
        assert_eq!(entries.len(), 200);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_budget_is_at_least_page_size() {
        let conn = connection(Arc::new(MockTransport::new([])));
        assert_eq!(conn.cursor(conn.query().to_scim(), 1).budget(), 100);
        assert_eq!(conn.cursor(conn.query().to_scim(), 0).budget(), 100);
    }

    #[tokio::test]
    async fn test_error_is_yielded_once_then_ends() {
        let transport = Arc::new(MockTransport::new([
            Ok(ping_page(0..1, Some("X"))),
            Err(crate::connection::TransportError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }),
        ]));
        let conn = connection(transport.clone());
        let mut cursor = conn.cursor(conn.query().to_scim(), 100);

        assert!(cursor.next_entry().await.unwrap().is_ok());
        let err = cursor.next_entry().await.unwrap().unwrap_err();
        assert!(matches!(err, ConnectionError::Transport(_)));
        assert!(cursor.next_entry().await.is_none());
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_into_stream() {
        let transport = Arc::new(MockTransport::new([Ok(ping_page(0..3, None))]));
        let conn = connection(transport);
        let entries: Vec<_> = conn
            .cursor(conn.query().to_scim(), 100)
            .into_stream()
            .collect()
            .await;
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(Result::is_ok));
    }
}
