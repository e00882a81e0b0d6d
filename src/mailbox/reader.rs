//! Unread mail reader

use crate::config::gmail::{LIST_PAGE_SIZE, MAX_RESULTS_LIMIT};
use crate::error::{DraftMcpError, Result, ValidationError};
use crate::gmail::service::MailService;
use crate::gmail::types::{Message, MessageRef};
use crate::gmail::utils::{best_body, find_header};
use crate::mailbox::types::EmailMessage;

/// Messages returned when the caller gives no limit
pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Fetch up to `max_results` unread messages, newest first.
///
/// Follows list pagination until enough ids are collected. Messages deleted
/// between listing and fetching are skipped. Read state is never changed.
pub async fn fetch_unread(
    service: &dyn MailService,
    query: &str,
    max_results: u32,
) -> Result<Vec<EmailMessage>> {
    if max_results == 0 || max_results > MAX_RESULTS_LIMIT {
        return Err(DraftMcpError::Validation(ValidationError::InvalidParameter {
            name: "max_results".to_string(),
            message: format!("must be between 1 and {}", MAX_RESULTS_LIMIT),
        }));
    }

    let refs = list_refs(service, query, max_results as usize).await?;
    tracing::debug!("{} unread message(s) listed", refs.len());

    let mut messages = Vec::with_capacity(refs.len());
    for msg_ref in refs {
        match service.get_message(&msg_ref.id).await {
            Ok(message) => messages.push(to_email_message(message, &msg_ref)),
            Err(DraftMcpError::Remote(e)) if e.is_not_found() => {
                tracing::warn!("Message {} vanished before it could be read", msg_ref.id);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(messages)
}

async fn list_refs(
    service: &dyn MailService,
    query: &str,
    wanted: usize,
) -> Result<Vec<MessageRef>> {
    let mut refs: Vec<MessageRef> = Vec::new();
    let mut page_token: Option<String> = None;

    while refs.len() < wanted {
        let page_size = (wanted - refs.len()).min(LIST_PAGE_SIZE as usize) as u32;
        let page = service
            .list_unread(query, page_size, page_token.as_deref())
            .await?;

        if page.messages.is_empty() {
            break;
        }
        refs.extend(page.messages);

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    refs.truncate(wanted);
    Ok(refs)
}

fn to_email_message(message: Message, msg_ref: &MessageRef) -> EmailMessage {
    let payload = message.payload.as_ref();
    let header = |name: &str| {
        payload
            .and_then(|p| find_header(p, name))
            .unwrap_or("")
            .to_string()
    };

    let snippet = message.snippet.clone().unwrap_or_default();
    let body = best_body(payload, &snippet);

    EmailMessage {
        from: header("from"),
        to: header("to"),
        subject: header("subject"),
        date: header("date"),
        thread_id: message
            .thread_id
            .clone()
            .unwrap_or_else(|| msg_ref.thread_id.clone()),
        message_id: message.id,
        snippet,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::types::{Header, MessagePart};

    #[test]
    fn test_to_email_message_maps_headers() {
        let message = Message {
            id: "m1".to_string(),
            thread_id: None,
            snippet: Some("preview".to_string()),
            payload: Some(MessagePart {
                headers: vec![
                    Header::new("From", "Jane <jane@example.com>"),
                    Header::new("To", "me@example.com"),
                    Header::new("SUBJECT", "Hello"),
                    Header::new("Date", "Tue, 2 Jan 2024 09:00:00 +0000"),
                ],
                ..Default::default()
            }),
            ..Default::default()
        };
        let msg_ref = MessageRef {
            id: "m1".to_string(),
            thread_id: "t-from-list".to_string(),
        };

        let email = to_email_message(message, &msg_ref);
        assert_eq!(email.message_id, "m1");
        assert_eq!(email.thread_id, "t-from-list");
        assert_eq!(email.from, "Jane <jane@example.com>");
        assert_eq!(email.subject, "Hello");
        assert_eq!(email.date, "Tue, 2 Jan 2024 09:00:00 +0000");
        // no body parts: snippet stands in
        assert_eq!(email.body, "preview");
    }
}
