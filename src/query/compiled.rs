use serde::{Deserialize, Serialize};

/// Search scope requested by PingDirectory-style grammars.
pub const SEARCH_SCOPE_WHOLE_SUBTREE: &str = "wholeSubtree";

/// The query object handed to a transport.
///
/// Serializes with the directory's field names (`includeAttributes`,
/// `searchScope`). Absent fields are omitted so the same struct serves both
/// the offset-based and the scope-based request shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledQuery {
    pub filter: String,
    pub include_attributes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_scope: Option<String>,
    /// Continuation token of the page being requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl CompiledQuery {
    /// A copy of this query asking for one page of `page_size` entries.
    pub fn page(&self, page_size: u32, cursor: Option<&str>) -> Self {
        Self {
            limit: Some(page_size),
            cursor: cursor.map(str::to_string),
            ..self.clone()
        }
    }
}
