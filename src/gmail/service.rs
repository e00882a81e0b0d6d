//! Mail service capability
//!
//! The narrow surface the reader and composer need from a mail provider.
//! `GmailClient` implements it over HTTP; tests substitute an in-memory mailbox.

use async_trait::async_trait;

use crate::error::Result;
use crate::gmail::types::{CreateDraftRequest, Draft, Message, MessageList, Thread};

#[async_trait]
pub trait MailService: Send + Sync {
    /// One page of message references matching `query`, newest first.
    async fn list_unread(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<MessageList>;

    /// Full message, including payload. Must not change read state.
    async fn get_message(&self, message_id: &str) -> Result<Message>;

    /// Thread with message metadata (`Message-ID` headers at least).
    async fn get_thread(&self, thread_id: &str) -> Result<Thread>;

    /// Store a draft. Never sends.
    async fn create_draft(&self, request: &CreateDraftRequest) -> Result<Draft>;
}
