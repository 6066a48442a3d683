use serde::{Deserialize, Serialize};

/// Cursor paging configuration.
///
/// ```toml
/// [pagination]
/// page_size = 100
/// cursor_pointer = "/_links/next/data/cursor"
/// size_pointer = "/size"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationConfig {
    /// Entries requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// JSON pointer to the continuation token in a page response.
    #[serde(default = "default_cursor_pointer")]
    pub cursor_pointer: String,

    /// JSON pointer to the page's entry count. Empty to skip.
    #[serde(default = "default_size_pointer")]
    pub size_pointer: String,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            cursor_pointer: default_cursor_pointer(),
            size_pointer: default_size_pointer(),
        }
    }
}

fn default_page_size() -> u32 {
    100
}

fn default_cursor_pointer() -> String {
    "/_links/next/data/cursor".to_string()
}

fn default_size_pointer() -> String {
    "/size".to_string()
}

impl PaginationConfig {
    pub(super) fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 {
            return Err("page_size must be greater than 0".to_string());
        }
        for (name, pointer) in [
            ("cursor_pointer", &self.cursor_pointer),
            ("size_pointer", &self.size_pointer),
        ] {
            if !pointer.is_empty() && !pointer.starts_with('/') {
                return Err(format!(
                    "{name} must be a JSON pointer starting with '/', got '{pointer}'"
                ));
            }
        }
        Ok(())
    }
}
