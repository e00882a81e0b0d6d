//! Configuration management for the Gmail draft MCP server
//!
//! Handles paths, environment variables, and configuration loading.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, DraftMcpError, Result};

/// Query used to select unread messages
pub const DEFAULT_UNREAD_QUERY: &str = "is:unread in:inbox";

/// Default per-request timeout against the Gmail API
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Configuration for the server
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to OAuth keys file (client credentials)
    pub oauth_path: PathBuf,

    /// Path to stored credentials (access/refresh tokens)
    pub credentials_path: PathBuf,

    /// Gmail API base URL
    pub api_base_url: String,

    /// Gmail search query selecting unread mail
    pub unread_query: String,

    /// Timeout applied to every HTTP request
    pub http_timeout: Duration,

    /// Scopes the stored token must carry
    pub scopes: Vec<String>,
}

impl Config {
    /// Create a new configuration from the environment, with default paths
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;

        let oauth_path = std::env::var("GMAIL_OAUTH_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir.join("gcp-oauth.keys.json"));

        let credentials_path = std::env::var("GMAIL_CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir.join("credentials.json"));

        let api_base_url = std::env::var("GMAIL_API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| gmail::API_BASE_URL.to_string());

        let unread_query = std::env::var("GMAIL_UNREAD_QUERY")
            .unwrap_or_else(|_| DEFAULT_UNREAD_QUERY.to_string());

        let http_timeout = match std::env::var("GMAIL_HTTP_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout(&raw)?,
            Err(_) => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            oauth_path,
            credentials_path,
            api_base_url,
            unread_query,
            http_timeout,
            scopes: default_scopes(),
        })
    }

    /// Build a configuration from explicit file paths, with every other
    /// setting at its default
    pub fn with_paths(oauth_path: impl Into<PathBuf>, credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            oauth_path: oauth_path.into(),
            credentials_path: credentials_path.into(),
            api_base_url: gmail::API_BASE_URL.to_string(),
            unread_query: DEFAULT_UNREAD_QUERY.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            scopes: default_scopes(),
        }
    }

    /// Get the configuration directory, creating it if necessary
    fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| {
                DraftMcpError::Config(ConfigError::DirNotFound {
                    path: "~".to_string(),
                })
            })?
            .join(".gmail-mcp");

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|_| {
                DraftMcpError::Config(ConfigError::DirCreationFailed {
                    path: config_dir.display().to_string(),
                })
            })?;
        }

        Ok(config_dir)
    }

    /// Check if credentials (tokens) exist
    pub fn credentials_exist(&self) -> bool {
        self.credentials_path.exists()
    }
}

/// Read access to messages, plus draft creation. Nothing that can send or delete.
fn default_scopes() -> Vec<String> {
    vec![
        gmail::SCOPE_READONLY.to_string(),
        gmail::SCOPE_COMPOSE.to_string(),
    ]
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(DraftMcpError::Config(ConfigError::InvalidConfig {
            message: format!("GMAIL_HTTP_TIMEOUT_SECS must be a positive integer, got '{}'", raw),
        })),
    }
}

/// Gmail API constants
pub mod gmail {
    /// Base URL for Gmail API
    pub const API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

    /// User ID for the authenticated user
    pub const USER_ID: &str = "me";

    /// Largest page the reader asks for in one list call
    pub const LIST_PAGE_SIZE: u32 = 100;

    /// Upper bound accepted for `max_results`
    pub const MAX_RESULTS_LIMIT: u32 = 500;

    pub const SCOPE_READONLY: &str = "https://www.googleapis.com/auth/gmail.readonly";
    pub const SCOPE_COMPOSE: &str = "https://www.googleapis.com/auth/gmail.compose";

    /// Grants that include both reading and drafting
    pub const BROADER_SCOPES: [&str; 2] = [
        "https://mail.google.com/",
        "https://www.googleapis.com/auth/gmail.modify",
    ];
}
