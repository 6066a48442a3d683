//! SCIM 2.0 filter construction
//!
//! Builds directory searches as a tree of conditions and compiles them into
//! RFC 7644 filter expressions and the query objects sent to a directory.
//!
//! ```
//! use scim_query::query::Builder;
//!
//! let mut query = Builder::new();
//! query
//!     .where_equals("department", "Sales")
//!     .where_nested(|q| q.where_present("mail").or_where_starts_with("uid", "tmp"));
//!
//! assert_eq!(
//!     query.to_scim_filter(),
//!     r#"department eq "Sales" and (mail pr or uid sw "tmp")"#,
//! );
//! ```
//!
//! ## Module Structure
//!
//! - [`builder`]: Condition tree and the fluent predicate API
//! - [`grammar`]: Filter and query compilation, per provider
//! - [`processor`]: Entry extraction from search responses
//! - [`operator`]: Operator and connector keywords
//! - [`value`]: Filter literals

pub mod builder;
pub mod compiled;
pub mod error;
pub mod grammar;
pub mod operator;
pub mod processor;
pub mod value;

pub use builder::{ArrayOfWheres, Attributes, Builder, DEFAULT_LIMIT, Where, WhereTuple};
pub use compiled::{CompiledQuery, SEARCH_SCOPE_WHOLE_SUBTREE};
pub use error::{QueryError, QueryResult};
pub use grammar::{Grammar, PingDirectoryGrammar, ScimGrammar};
pub use operator::{Connector, Operator, UnknownKeyword};
pub use processor::{PingDirectoryProcessor, Processor, ScimProcessor};
pub use value::FilterValue;
