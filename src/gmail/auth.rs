//! OAuth credentials for the Gmail API
//!
//! Handles:
//! - Loading client credentials
//! - Loading and persisting stored tokens
//! - Refreshing the access token
//!
//! Obtaining the first refresh token (the consent flow) happens outside this
//! server; it only consumes the credentials file.
//!
//! Refresh discipline: any number of callers may read the current token
//! concurrently. A caller that finds it expiring takes `refresh_gate`,
//! re-reads, and refreshes only if nobody else did while it waited. The
//! credentials lock is held for writing only to swap in the new token.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::config::{gmail::BROADER_SCOPES, Config};
use crate::error::{AuthError, DraftMcpError, Result};

/// Tokens this close to expiry (seconds) are refreshed before use
const EXPIRY_SKEW_SECS: i64 = 300;

/// OAuth client credentials
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthKeys {
    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: String,

    /// Token URI
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// OAuth keys file format (can be "installed" or "web")
#[derive(Debug, Deserialize)]
struct OAuthKeysFile {
    #[serde(alias = "web")]
    installed: Option<OAuthKeys>,
}

/// Stored credentials (tokens)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    /// Access token
    pub access_token: String,

    /// Refresh token
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Expiry timestamp (Unix seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,

    /// Scopes
    #[serde(default)]
    pub scope: String,
}

impl StoredCredentials {
    /// True when the access token expires within the skew window.
    /// Tokens without a recorded expiry are trusted until Gmail rejects them.
    pub fn is_expiring(&self, now: i64) -> bool {
        self.expiry_date
            .map(|expiry| expiry - now < EXPIRY_SKEW_SECS)
            .unwrap_or(false)
    }

    /// Entries of `required` this token was not granted. A token that does
    /// not record its scopes is given the benefit of the doubt.
    pub fn missing_scopes<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        let granted: HashSet<&str> = self.scope.split_whitespace().collect();
        if granted.is_empty() || BROADER_SCOPES.iter().any(|s| granted.contains(s)) {
            return Vec::new();
        }

        required
            .iter()
            .map(String::as_str)
            .filter(|scope| !granted.contains(scope))
            .collect()
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Token response from OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    #[serde(default)]
    scope: String,
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// OAuth authenticator. Owns the only copy of the credential.
pub struct Authenticator {
    /// Configuration
    config: Config,

    /// HTTP client
    http_client: reqwest::Client,

    /// OAuth client credentials
    keys: OAuthKeys,

    /// Current credentials (tokens)
    credentials: RwLock<Option<StoredCredentials>>,

    /// Serializes refreshes
    refresh_gate: Mutex<()>,
}

impl Authenticator {
    /// Create a new authenticator, loading keys and any stored credentials
    pub async fn new(config: Config) -> Result<Self> {
        let keys = Self::load_oauth_keys(&config.oauth_path)?;

        let credentials = if config.credentials_exist() {
            match Self::load_credentials(&config.credentials_path).await {
                Ok(creds) => Some(creds),
                Err(e) => {
                    tracing::warn!(
                        "Ignoring unreadable credentials file {}: {}",
                        config.credentials_path.display(),
                        e
                    );
                    None
                }
            }
        } else {
            None
        };

        Self::from_parts(config, keys, credentials)
    }

    /// Assemble an authenticator from already-loaded parts
    pub fn from_parts(
        config: Config,
        keys: OAuthKeys,
        credentials: Option<StoredCredentials>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            config,
            http_client,
            keys,
            credentials: RwLock::new(credentials),
            refresh_gate: Mutex::new(()),
        })
    }

    /// Load OAuth keys from file
    fn load_oauth_keys(path: &Path) -> Result<OAuthKeys> {
        if !path.exists() {
            return Err(DraftMcpError::Auth(AuthError::KeysFileNotFound {
                path: path.display().to_string(),
            }));
        }

        let content = std::fs::read_to_string(path)?;
        let keys_file: OAuthKeysFile = serde_json::from_str(&content)
            .map_err(|_| DraftMcpError::Auth(AuthError::InvalidKeysFormat))?;

        keys_file
            .installed
            .ok_or(DraftMcpError::Auth(AuthError::InvalidKeysFormat))
    }

    /// Load stored credentials from file
    async fn load_credentials(path: &Path) -> Result<StoredCredentials> {
        let content = tokio::fs::read_to_string(path).await?;
        let creds: StoredCredentials = serde_json::from_str(&content)?;
        Ok(creds)
    }

    /// Save credentials to file
    async fn save_credentials(&self, credentials: &StoredCredentials) -> Result<()> {
        let content = serde_json::to_string_pretty(credentials)?;
        tokio::fs::write(&self.config.credentials_path, content).await?;
        Ok(())
    }

    /// Check if we hold any credentials at all
    pub async fn is_authenticated(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    /// Configured scopes the stored token lacks
    pub async fn missing_scopes(&self) -> Vec<String> {
        self.credentials
            .read()
            .await
            .as_ref()
            .map(|c| {
                c.missing_scopes(&self.config.scopes)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mark `rejected` stale so the next caller goes through a refresh.
    /// A token swapped in after the rejected request went out is left alone.
    pub async fn invalidate(&self, rejected: &str) {
        let mut creds = self.credentials.write().await;
        if let Some(c) = creds.as_mut().filter(|c| c.access_token == rejected) {
            tracing::info!("Access token rejected, refreshing on next use");
            c.expiry_date = Some(0);
        }
    }

    /// Get a valid access token, refreshing if necessary
    pub async fn get_access_token(&self) -> Result<String> {
        if let Some(token) = self.current_token().await? {
            return Ok(token);
        }

        let _gate = self.refresh_gate.lock().await;

        // Someone else may have refreshed while we waited on the gate
        if let Some(token) = self.current_token().await? {
            return Ok(token);
        }

        self.refresh_token().await
    }

    /// The stored access token if it is still usable, `None` if it needs a refresh
    async fn current_token(&self) -> Result<Option<String>> {
        let creds = self.credentials.read().await;

        match creds.as_ref() {
            None => Err(DraftMcpError::Auth(AuthError::CredentialsNotFound {
                path: self.config.credentials_path.display().to_string(),
            })),
            Some(c) if c.is_expiring(now_secs()) => Ok(None),
            Some(c) => Ok(Some(c.access_token.clone())),
        }
    }

    /// Refresh the access token using the refresh token. Caller holds `refresh_gate`.
    async fn refresh_token(&self) -> Result<String> {
        let refresh_token = self
            .credentials
            .read()
            .await
            .as_ref()
            .and_then(|c| c.refresh_token.clone())
            .ok_or_else(|| refresh_failed("No refresh token available"))?;

        tracing::info!("Refreshing Gmail access token");

        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&self.keys.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| refresh_failed(format!("token endpoint unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("Token refresh rejected ({})", status);
            return Err(refresh_failed(format!("{}: {}", status, text)));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| refresh_failed(format!("unreadable token response: {}", e)))?;

        let new_credentials = StoredCredentials {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token.or(Some(refresh_token)),
            token_type: token_response.token_type,
            expiry_date: token_response.expires_in.map(|e| now_secs() + e),
            scope: token_response.scope,
        };

        if let Err(e) = self.save_credentials(&new_credentials).await {
            // The in-memory token is still good for this process
            tracing::warn!("Failed to persist refreshed credentials: {}", e);
        }

        let token = new_credentials.access_token.clone();
        *self.credentials.write().await = Some(new_credentials);

        Ok(token)
    }
}

fn refresh_failed(message: impl Into<String>) -> DraftMcpError {
    DraftMcpError::Auth(AuthError::TokenRefreshFailed {
        message: message.into(),
    })
}
