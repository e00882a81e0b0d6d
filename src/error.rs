//! Error types for the Gmail draft MCP server
//!
//! Every failure maps onto one of three caller-facing categories
//! (authentication, validation, remote service) plus an internal bucket
//! for local I/O and configuration problems.

use thiserror::Error;

/// Main error type for the server
#[derive(Error, Debug)]
pub enum DraftMcpError {
    /// OAuth authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Non-2xx answers from the Gmail API
    #[error("Gmail API error: {0}")]
    Remote(#[from] RemoteServiceError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors (no response received, or body unreadable)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// OAuth authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("OAuth keys file not found: {path}")]
    KeysFileNotFound { path: String },

    #[error("Invalid OAuth keys format: expected 'installed' or 'web' credentials")]
    InvalidKeysFormat,

    #[error("Credentials file not found: {path}")]
    CredentialsNotFound { path: String },

    #[error("Failed to refresh access token: {message}")]
    TokenRefreshFailed { message: String },

    #[error("Access token rejected by Gmail: {message}")]
    Rejected { message: String },
}

/// A non-2xx response from the Gmail API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{context} failed ({status}): {message}")]
pub struct RemoteServiceError {
    /// What we were trying to do, e.g. "list messages"
    pub context: String,

    /// HTTP status code
    pub status: u16,

    /// Provider error message
    pub message: String,
}

impl RemoteServiceError {
    pub fn new(context: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            status,
            message: message.into(),
        }
    }

    /// Rate limiting and server-side failures may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        self.status == 429 || self.status >= 500
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found: {path}")]
    DirNotFound { path: String },

    #[error("Failed to create config directory: {path}")]
    DirCreationFailed { path: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field(s): {}", fields.join(", "))]
    MissingFields { fields: Vec<String> },

    #[error("Invalid parameter: {name} - {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Thread not found: {thread_id}")]
    UnknownThread { thread_id: String },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },
}

/// Caller-facing failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Validation,
    RemoteService,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "AuthenticationError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::RemoteService => "RemoteServiceError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

impl DraftMcpError {
    /// Category reported back through the tool channel
    pub fn kind(&self) -> ErrorKind {
        match self {
            DraftMcpError::Auth(_) => ErrorKind::Authentication,
            DraftMcpError::Validation(_) | DraftMcpError::Mcp(_) => ErrorKind::Validation,
            DraftMcpError::Remote(_) | DraftMcpError::Http(_) => ErrorKind::RemoteService,
            DraftMcpError::Config(_) | DraftMcpError::Io(_) | DraftMcpError::Json(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// HTTP status of the failed provider call, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            DraftMcpError::Remote(e) => Some(e.status),
            DraftMcpError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the caller may retry with backoff. This server never retries itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            DraftMcpError::Remote(e) => e.is_retryable(),
            DraftMcpError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, DraftMcpError>;
