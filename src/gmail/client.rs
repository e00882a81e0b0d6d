//! Gmail API client
//!
//! reqwest-backed implementation of [`MailService`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::gmail::USER_ID;
use crate::config::Config;
use crate::error::{AuthError, DraftMcpError, RemoteServiceError, Result};
use crate::gmail::auth::Authenticator;
use crate::gmail::service::MailService;
use crate::gmail::types::*;

/// Gmail API client
pub struct GmailClient {
    /// HTTP client
    http_client: reqwest::Client,

    /// OAuth authenticator
    authenticator: Arc<Authenticator>,

    /// API base URL, without trailing slash
    base_url: String,
}

impl GmailClient {
    /// Create a new Gmail client
    pub fn new(config: &Config, authenticator: Arc<Authenticator>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            http_client,
            authenticator,
            base_url: config.api_base_url.clone(),
        })
    }

    /// Get a valid access token
    async fn access_token(&self) -> Result<String> {
        self.authenticator.get_access_token().await
    }

    /// Base URL for messages
    fn messages_url(&self) -> String {
        format!("{}/users/{}/messages", self.base_url, USER_ID)
    }

    /// Base URL for threads
    fn threads_url(&self) -> String {
        format!("{}/users/{}/threads", self.base_url, USER_ID)
    }

    /// Base URL for drafts
    fn drafts_url(&self) -> String {
        format!("{}/users/{}/drafts", self.base_url, USER_ID)
    }

    /// GET `url` with bearer auth and decode the JSON body
    async fn get_json<T: DeserializeOwned>(&self, url: &str, context: &str) -> Result<T> {
        let token = self.access_token().await?;

        tracing::debug!("GET {}", url);
        let response = self.http_client.get(url).bearer_auth(&token).send().await?;

        self.finish(response, &token, context).await
    }

    /// Decode `response`. A 401 marks `token` stale so the next call refreshes it.
    async fn finish<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        token: &str,
        context: &str,
    ) -> Result<T> {
        let result = decode_response(response, context).await;
        if let Err(DraftMcpError::Auth(AuthError::Rejected { .. })) = &result {
            self.authenticator.invalidate(token).await;
        }
        result
    }
}

/// Map a Gmail response onto our error taxonomy, decoding the body on success
async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|body| body.error.message)
        .unwrap_or(text);

    if status.as_u16() == 401 {
        return Err(DraftMcpError::Auth(AuthError::Rejected { message }));
    }

    tracing::warn!("Gmail {} failed with {}", context, status);
    Err(DraftMcpError::Remote(RemoteServiceError::new(
        context,
        status.as_u16(),
        message,
    )))
}

#[async_trait]
impl MailService for GmailClient {
    async fn list_unread(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<MessageList> {
        let mut url = format!(
            "{}?q={}&maxResults={}",
            self.messages_url(),
            urlencoding::encode(query),
            page_size
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        self.get_json(&url, "list messages").await
    }

    async fn get_message(&self, message_id: &str) -> Result<Message> {
        // format=full reads the message without touching its UNREAD label
        let url = format!(
            "{}/{}?format=full",
            self.messages_url(),
            urlencoding::encode(message_id)
        );

        self.get_json(&url, "get message").await
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Thread> {
        let url = format!(
            "{}/{}?format=metadata&metadataHeaders=Message-ID",
            self.threads_url(),
            urlencoding::encode(thread_id)
        );

        self.get_json(&url, "get thread").await
    }

    async fn create_draft(&self, request: &CreateDraftRequest) -> Result<Draft> {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .post(self.drafts_url())
            .bearer_auth(&token)
            .json(request)
            .send()
            .await?;

        self.finish(response, &token, "create draft").await
    }
}
