//! SCIM 2.0 directory query client
//!
//! Builds SCIM filter expressions with a fluent condition tree, compiles them
//! into the query objects a directory's REST endpoint expects, and pages
//! through the results with a continuation-token cursor.
//!
//! ## RFC References
//!
//! - RFC 7644 Section 3.4.2.2: Filtering
//!
//! ## Module Structure
//!
//! - [`query`]: Condition tree, filter grammar and response processors
//! - [`connection`]: Transport, query execution, paging and the query log
//! - [`config`]: TOML configuration with environment interpolation
//! - `observability`: Console logging setup (feature `cli`)

pub mod config;
pub mod connection;
#[cfg(feature = "cli")]
pub mod observability;
pub mod query;

#[cfg(test)]
mod tests;

pub use config::{ConfigError, DirectoryConfig};
pub use connection::{Connection, ConnectionError, ConnectionResult, PageCursor};
pub use query::{Builder, CompiledQuery, Connector, FilterValue, Operator, QueryError, Where};
