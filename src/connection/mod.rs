//! Directory connections.
//!
//! A [`Connection`] ties a transport to the grammar and response processor of
//! one directory flavor, runs compiled queries through it, and keeps an
//! optional in-memory log of what was sent.
//!
//! ## Module Structure
//!
//! - [`transport`]: The [`Transport`] seam and its reqwest implementation
//! - [`cursor`]: Lazy multi-page retrieval
//! - [`query_log`]: Executed-query records

pub mod cursor;
pub mod query_log;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod transport;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

pub use cursor::PageCursor;
use parking_lot::Mutex;
pub use query_log::{LoggedQuery, QueryLog};
use serde_json::Value;
pub use transport::{HttpTransport, Transport, TransportError};

use crate::{
    config::{DirectoryConfig, PaginationConfig, Provider},
    query::{
        Attributes, Builder, CompiledQuery, Grammar, PingDirectoryGrammar, PingDirectoryProcessor,
        Processor, ScimGrammar, ScimProcessor, builder::ALL_ATTRIBUTES,
    },
};

/// Error type for connection operations.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Result type for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

impl Provider {
    pub fn grammar(&self) -> Arc<dyn Grammar> {
        match self {
            Provider::Scim => Arc::new(ScimGrammar),
            Provider::PingDirectory => Arc::new(PingDirectoryGrammar),
        }
    }

    pub fn processor(&self) -> Arc<dyn Processor> {
        match self {
            Provider::Scim => Arc::new(ScimProcessor),
            Provider::PingDirectory => Arc::new(PingDirectoryProcessor),
        }
    }
}

#[derive(Debug)]
struct ConnectionInner {
    name: String,
    transport: Arc<dyn Transport>,
    grammar: Arc<dyn Grammar>,
    processor: Arc<dyn Processor>,
    pagination: PaginationConfig,
    query_log: Mutex<QueryLog>,
    pretending: AtomicBool,
}

/// A handle to one directory. Cheap to clone; clones share the query log.
#[derive(Debug, Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// A connection using the provider's default grammar and processor.
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn Transport>,
        provider: Provider,
        pagination: PaginationConfig,
    ) -> Self {
        Self::with_parts(
            name,
            transport,
            provider.grammar(),
            provider.processor(),
            pagination,
        )
    }

    pub fn with_parts(
        name: impl Into<String>,
        transport: Arc<dyn Transport>,
        grammar: Arc<dyn Grammar>,
        processor: Arc<dyn Processor>,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                name: name.into(),
                transport,
                grammar,
                processor,
                pagination,
                query_log: Mutex::new(QueryLog::default()),
                pretending: AtomicBool::new(false),
            }),
        }
    }

    /// An HTTP connection built from configuration.
    pub fn from_config(config: &DirectoryConfig) -> ConnectionResult<Self> {
        let transport = HttpTransport::new(&config.driver)?;
        tracing::debug!(
            connection = %config.name,
            url = %transport.url(),
            provider = ?config.driver.provider,
            "Created directory connection"
        );
        Ok(Self::new(
            config.name.clone(),
            Arc::new(transport),
            config.driver.provider,
            config.pagination.clone(),
        ))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn grammar(&self) -> &Arc<dyn Grammar> {
        &self.inner.grammar
    }

    pub fn processor(&self) -> &Arc<dyn Processor> {
        &self.inner.processor
    }

    pub fn pagination(&self) -> &PaginationConfig {
        &self.inner.pagination
    }

    /// A new query compiled with this connection's grammar.
    pub fn query(&self) -> Builder {
        Builder::with_grammar(Arc::clone(&self.inner.grammar))
    }

    /// Sends one query and returns the raw response body.
    ///
    /// The query is timed and logged; while pretending, nothing is sent and
    /// the response is an empty array.
    pub(crate) async fn run(&self, query: &CompiledQuery) -> ConnectionResult<Value> {
        let start = Instant::now();
        let response = if self.pretending() {
            Value::Array(Vec::new())
        } else {
            self.inner.transport.send(query).await?
        };
        let time_ms = start.elapsed().as_secs_f64() * 1000.0;

        tracing::debug!(
            connection = %self.inner.name,
            filter = %query.filter,
            cursor = ?query.cursor,
            elapsed_ms = time_ms,
            pretend = self.pretending(),
            "Executed directory query"
        );
        self.inner.query_log.lock().record(query, time_ms);

        Ok(response)
    }

    /// Runs a query and returns its entries.
    pub async fn select(&self, query: &CompiledQuery) -> ConnectionResult<Vec<Value>> {
        let response = self.run(query).await?;
        Ok(self.inner.processor.process_select(response))
    }

    /// The first entry of [`Connection::select`].
    pub async fn select_one(&self, query: &CompiledQuery) -> ConnectionResult<Option<Value>> {
        Ok(self.select(query).await?.into_iter().next())
    }

    /// Pages through every entry matching `query`, up to the budget
    /// `max(page_size, limit)`.
    pub fn cursor(&self, query: CompiledQuery, limit: u32) -> PageCursor {
        PageCursor::new(self.clone(), query, limit)
    }

    // ========================================================================
    // Query log
    // ========================================================================

    pub fn enable_query_log(&self) {
        self.inner.query_log.lock().set_enabled(true);
    }

    pub fn disable_query_log(&self) {
        self.inner.query_log.lock().set_enabled(false);
    }

    pub fn logging(&self) -> bool {
        self.inner.query_log.lock().is_enabled()
    }

    pub fn query_log(&self) -> Vec<LoggedQuery> {
        self.inner.query_log.lock().entries().to_vec()
    }

    pub fn flush_query_log(&self) {
        self.inner.query_log.lock().flush();
    }

    pub fn pretending(&self) -> bool {
        self.inner.pretending.load(Ordering::Acquire)
    }

    /// Runs `callback` without contacting the directory and returns the
    /// queries it would have sent.
    ///
    /// The query log is enabled and emptied for the duration of the callback;
    /// its previous state and entries are restored afterwards, also when the
    /// returned future is dropped early or the callback panics.
    pub async fn pretend<F, Fut>(&self, callback: F) -> Vec<LoggedQuery>
    where
        F: FnOnce(Connection) -> Fut,
        Fut: Future<Output = ()>,
    {
        let guard = PretendGuard::enter(&self.inner);
        callback(self.clone()).await;
        guard.finish()
    }
}

/// Holds a connection in pretend mode until finished or dropped.
struct PretendGuard<'a> {
    inner: &'a ConnectionInner,
    was_logging: bool,
    previous: Option<Vec<LoggedQuery>>,
}

impl<'a> PretendGuard<'a> {
    fn enter(inner: &'a ConnectionInner) -> Self {
        let (was_logging, previous) = {
            let mut log = inner.query_log.lock();
            let was_logging = log.is_enabled();
            log.set_enabled(true);
            (was_logging, log.replace(Vec::new()))
        };
        inner.pretending.store(true, Ordering::Release);
        Self {
            inner,
            was_logging,
            previous: Some(previous),
        }
    }

    /// Leaves pretend mode and returns the captured queries.
    fn finish(mut self) -> Vec<LoggedQuery> {
        self.restore()
    }

    fn restore(&mut self) -> Vec<LoggedQuery> {
        let Some(previous) = self.previous.take() else {
            return Vec::new();
        };
        self.inner.pretending.store(false, Ordering::Release);
        let mut log = self.inner.query_log.lock();
        log.set_enabled(self.was_logging);
        log.replace(previous)
    }
}

impl Drop for PretendGuard<'_> {
    fn drop(&mut self) {
        if self.previous.is_some() {
            tracing::debug!("Pretend interrupted, restoring query log");
            self.restore();
        }
    }
}

// ============================================================================
// Query execution
// ============================================================================

impl Builder {
    /// Runs the query and returns every entry of the response.
    pub async fn get(&self, connection: &Connection) -> ConnectionResult<Vec<Value>> {
        connection.select(&self.to_scim()).await
    }

    /// Like [`Builder::get`], projecting `attributes` when the query itself
    /// requests every attribute.
    pub async fn get_with_attributes(
        &self,
        connection: &Connection,
        attributes: impl Into<Attributes>,
    ) -> ConnectionResult<Vec<Value>> {
        if self.attributes() == [ALL_ATTRIBUTES] {
            let mut query = self.clone();
            query.select(attributes);
            query.get(connection).await
        } else {
            self.get(connection).await
        }
    }

    /// The first matching entry, requesting a single result.
    pub async fn first(&self, connection: &Connection) -> ConnectionResult<Option<Value>> {
        let mut query = self.clone();
        query.take(1);
        Ok(query.get(connection).await?.into_iter().next())
    }

    /// The entry whose `uid` equals `uid`.
    pub async fn find(&self, connection: &Connection, uid: &str) -> ConnectionResult<Option<Value>> {
        let mut query = self.clone();
        query.where_equals("uid", uid);
        query.first(connection).await
    }

    /// A lazy cursor over every matching entry.
    pub fn cursor(&self, connection: &Connection) -> PageCursor {
        connection.cursor(self.to_scim(), self.limit_value())
    }
}
