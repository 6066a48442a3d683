use serde::{Deserialize, Serialize};

/// Directory transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    /// Search endpoint of the directory.
    pub url: String,

    /// HTTP method used to send the query object.
    #[serde(default)]
    pub method: HttpMethod,

    /// Directory flavor, selecting the grammar and response processor.
    #[serde(default)]
    pub provider: Provider,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// HTTP basic credentials.
    #[serde(default)]
    pub auth: Option<BasicAuthConfig>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl DriverConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::default(),
            provider: Provider::default(),
            timeout_secs: default_timeout_secs(),
            auth: None,
        }
    }

    pub(super) fn validate(&self) -> Result<(), String> {
        let url = url::Url::parse(&self.url).map_err(|e| format!("invalid url '{}': {e}", self.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "url must use http or https, got '{}'",
                url.scheme()
            ));
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if let Some(auth) = &self.auth
            && auth.username.is_empty()
        {
            return Err("auth.username must not be empty".to_string());
        }
        Ok(())
    }
}

/// How the query object is sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpMethod {
    /// Fields as URL query parameters.
    #[default]
    Get,
    /// Fields as a JSON body.
    Post,
}

/// Directory flavor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Standard SCIM list responses with offset paging.
    #[default]
    Scim,
    /// PingDirectory REST API: whole-subtree scope, entries under
    /// `_embedded.entries`.
    PingDirectory,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicAuthConfig {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for BasicAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthConfig")
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}
