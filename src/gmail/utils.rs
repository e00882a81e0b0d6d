//! Gmail utility functions
//!
//! Raw message encoding, reply construction, and content extraction utilities.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use mail_builder::MessageBuilder;

use crate::error::{DraftMcpError, Result, ValidationError};
use crate::gmail::types::{EmailContent, MessagePart, Thread};

/// Encode a raw email message for Gmail API (base64url, no padding)
pub fn encode_raw_message(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

/// Decode base64url data from Gmail API
/// Handles both padded and non-padded base64url encoding
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(data))
        .or_else(|_| base64::engine::general_purpose::STANDARD.decode(data))
        .map_err(|e| {
            DraftMcpError::Validation(ValidationError::InvalidParameter {
                name: "base64 data".to_string(),
                message: e.to_string(),
            })
        })
}

/// Decode base64url data to string. Invalid UTF-8 sequences are replaced.
pub fn decode_base64url_string(data: &str) -> Result<String> {
    let bytes = decode_base64url(data)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Recursively extract email body content from MIME message parts
pub fn extract_email_content(message_part: &MessagePart) -> EmailContent {
    let mut content = EmailContent::default();

    let mime_type = message_part.mime_type.as_deref().unwrap_or("");

    if let Some(data) = message_part.body.as_ref().and_then(|b| b.data.as_ref()) {
        // Attachments carry an attachmentId, inline text carries data
        if mime_type.starts_with("text/") {
            match decode_base64url_string(data) {
                Ok(decoded) => {
                    if mime_type == "text/plain" {
                        content.text = decoded;
                    } else if mime_type == "text/html" {
                        content.html = decoded;
                    }
                }
                Err(e) => {
                    tracing::debug!("Failed to decode {} part: {}", mime_type, e);
                }
            }
        }
    }

    // multipart/alternative, multipart/mixed, multipart/related, ...
    for part in &message_part.parts {
        let nested = extract_email_content(part);
        content.text.push_str(&nested.text);
        content.html.push_str(&nested.html);
    }

    content
}

/// Pick the best body: plain text, then HTML, then the provider snippet
pub fn best_body(payload: Option<&MessagePart>, snippet: &str) -> String {
    let content = payload.map(extract_email_content).unwrap_or_default();

    if !content.text.is_empty() {
        content.text
    } else if !content.html.is_empty() {
        content.html
    } else {
        snippet.to_string()
    }
}

/// Find header value by name (case-insensitive)
pub fn find_header<'a>(part: &'a MessagePart, name: &str) -> Option<&'a str> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// `Message-ID` of the newest message in a thread that carries one
pub fn latest_message_id(thread: &Thread) -> Option<String> {
    thread
        .messages
        .iter()
        .rev()
        .filter_map(|m| m.payload.as_ref())
        .find_map(|p| find_header(p, "message-id"))
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Split `"Name <addr@host>"` into its display name and address.
/// A bare address comes back with no name.
pub fn parse_mailbox(value: &str) -> (Option<&str>, &str) {
    let value = value.trim();

    if let (Some(open), true) = (value.rfind('<'), value.ends_with('>')) {
        let address = value[open + 1..value.len() - 1].trim();
        let name = value[..open].trim().trim_matches('"').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        return (name, address);
    }

    (None, value)
}

/// Parameters for a reply draft
#[derive(Debug, Clone)]
pub struct ReplyParams<'a> {
    pub to: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
    /// `Message-ID` being replied to, with or without angle brackets
    pub in_reply_to: Option<&'a str>,
}

/// Build an RFC 5322 plain-text reply
pub fn create_reply_message(params: &ReplyParams<'_>) -> Result<String> {
    let headers = [
        ("to", Some(params.to)),
        ("subject", Some(params.subject)),
        ("in_reply_to", params.in_reply_to),
    ];
    for (name, value) in headers {
        if value.map_or(false, |v| v.contains(['\r', '\n'])) {
            return Err(DraftMcpError::Validation(ValidationError::InvalidParameter {
                name: name.to_string(),
                message: "must not contain line breaks".to_string(),
            }));
        }
    }

    let (name, address) = parse_mailbox(params.to);

    let mut builder = match name {
        Some(name) => MessageBuilder::new().to((name, address)),
        None => MessageBuilder::new().to(address),
    };

    builder = builder.subject(params.subject).text_body(params.body);

    if let Some(reference) = params.in_reply_to {
        let reference = reference.trim().trim_start_matches('<').trim_end_matches('>');
        builder = builder.in_reply_to(reference).references(reference);
    }

    Ok(builder.write_to_string()?)
}
