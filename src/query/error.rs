/// Errors raised while building a query.
///
/// These are programming errors detected before anything is compiled or sent
/// to the directory; retrying the same call will fail the same way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl QueryError {
    pub(crate) fn illegal_operator_and_value() -> Self {
        QueryError::InvalidArgument("Illegal operator and value combination.".to_string())
    }
}

/// Result type for query building operations.
pub type QueryResult<T> = Result<T, QueryError>;
