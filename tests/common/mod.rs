//! In-memory mailbox standing in for the Gmail API

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use gmail_draft_mcp::error::{AuthError, DraftMcpError, RemoteServiceError, Result};
use gmail_draft_mcp::gmail::service::MailService;
use gmail_draft_mcp::gmail::types::*;

/// Fake provider. Unread refs are kept newest first, like Gmail returns them.
#[derive(Default)]
pub struct FakeMailbox {
    refs: Vec<MessageRef>,
    messages: HashMap<String, Message>,
    threads: HashMap<String, Thread>,
    /// Largest page the fake hands out, whatever the caller asks for
    page_limit: Option<u32>,
    /// Every call fails with this status when set
    fail_status: Mutex<Option<u16>>,
    calls: Mutex<Vec<String>>,
    drafts: Mutex<Vec<CreateDraftRequest>>,
}

impl FakeMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mailbox with `count` unread messages m1 (newest) .. m{count}, each in its own thread t{i}
    pub fn with_unread(count: usize) -> Self {
        let mut mailbox = Self::new();
        for i in 1..=count {
            mailbox.add_unread(
                &format!("m{}", i),
                &format!("t{}", i),
                &format!("Sender {} <sender{}@example.com>", i, i),
                &format!("Subject {}", i),
                &format!("Body of message {}", i),
            );
        }
        mailbox
    }

    /// Append an unread message (older than those already present)
    pub fn add_unread(&mut self, id: &str, thread_id: &str, from: &str, subject: &str, body: &str) {
        let message = Message {
            id: id.to_string(),
            thread_id: Some(thread_id.to_string()),
            label_ids: vec!["INBOX".to_string(), "UNREAD".to_string()],
            snippet: Some(body.chars().take(20).collect()),
            payload: Some(MessagePart {
                mime_type: Some("multipart/alternative".to_string()),
                headers: vec![
                    Header::new("From", from),
                    Header::new("To", "me@example.com"),
                    Header::new("Subject", subject),
                    Header::new("Date", "Mon, 1 Jan 2024 10:00:00 +0000"),
                    Header::new("Message-ID", format!("<{}@mail.example.com>", id)),
                ],
                parts: vec![
                    text_part("text/plain", body),
                    text_part("text/html", &format!("<p>{}</p>", body)),
                ],
                ..Default::default()
            }),
            internal_date: None,
        };

        self.refs.push(MessageRef {
            id: id.to_string(),
            thread_id: thread_id.to_string(),
        });
        self.threads
            .entry(thread_id.to_string())
            .or_insert_with(|| Thread {
                id: thread_id.to_string(),
                snippet: None,
                messages: Vec::new(),
            })
            .messages
            .push(message.clone());
        self.messages.insert(id.to_string(), message);
    }

    /// A thread with no unread mail in it
    pub fn add_thread(&mut self, thread_id: &str) {
        self.threads.insert(
            thread_id.to_string(),
            Thread {
                id: thread_id.to_string(),
                snippet: None,
                messages: Vec::new(),
            },
        );
    }

    /// Listed but deleted before it can be fetched
    pub fn vanish(&mut self, id: &str) {
        self.messages.remove(id);
    }

    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = Some(limit);
        self
    }

    pub fn fail_with(&self, status: u16) {
        *self.fail_status.lock().unwrap() = Some(status);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }

    pub fn drafts(&self) -> Vec<CreateDraftRequest> {
        self.drafts.lock().unwrap().clone()
    }

    fn record(&self, name: &str) -> Result<()> {
        self.calls.lock().unwrap().push(name.to_string());

        match *self.fail_status.lock().unwrap() {
            Some(401) => Err(DraftMcpError::Auth(AuthError::Rejected {
                message: "Invalid Credentials".to_string(),
            })),
            Some(status) => Err(DraftMcpError::Remote(RemoteServiceError::new(
                name,
                status,
                "injected failure",
            ))),
            None => Ok(()),
        }
    }
}

fn text_part(mime_type: &str, text: &str) -> MessagePart {
    MessagePart {
        mime_type: Some(mime_type.to_string()),
        body: Some(MessagePartBody {
            size: text.len() as i64,
            data: Some(URL_SAFE_NO_PAD.encode(text)),
            attachment_id: None,
        }),
        ..Default::default()
    }
}

fn not_found(context: &str) -> DraftMcpError {
    DraftMcpError::Remote(RemoteServiceError::new(
        context,
        404,
        "Requested entity was not found.",
    ))
}

#[async_trait]
impl MailService for FakeMailbox {
    async fn list_unread(
        &self,
        _query: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<MessageList> {
        self.record("list_unread")?;

        let start: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let size = self.page_limit.map_or(page_size, |l| l.min(page_size)) as usize;
        let end = (start + size).min(self.refs.len());

        Ok(MessageList {
            messages: self.refs[start.min(end)..end].to_vec(),
            next_page_token: (end < self.refs.len()).then(|| end.to_string()),
            result_size_estimate: Some(self.refs.len() as u32),
        })
    }

    async fn get_message(&self, message_id: &str) -> Result<Message> {
        self.record("get_message")?;
        self.messages
            .get(message_id)
            .cloned()
            .ok_or_else(|| not_found("get message"))
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Thread> {
        self.record("get_thread")?;
        self.threads
            .get(thread_id)
            .cloned()
            .ok_or_else(|| not_found("get thread"))
    }

    async fn create_draft(&self, request: &CreateDraftRequest) -> Result<Draft> {
        self.record("create_draft")?;

        let mut drafts = self.drafts.lock().unwrap();
        drafts.push(request.clone());
        let n = drafts.len();

        Ok(Draft {
            id: format!("r-{}", n),
            message: Message {
                id: format!("dm-{}", n),
                thread_id: request.message.thread_id.clone(),
                label_ids: vec!["DRAFT".to_string()],
                ..Default::default()
            },
        })
    }
}

/// Decode a draft's raw RFC 5322 text
pub fn decode_raw(request: &CreateDraftRequest) -> String {
    let bytes = URL_SAFE_NO_PAD.decode(&request.message.raw).unwrap();
    String::from_utf8(bytes).unwrap()
}
