//! Records returned by the mailbox operations

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ValidationError;
use crate::gmail::utils::parse_mailbox;

/// An unread message, normalized from the Gmail representation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub message_id: String,
    pub thread_id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub snippet: String,
    pub body: String,
    /// `Date` header exactly as the provider returned it
    pub date: String,
}

/// Input to [`create_draft_reply`](super::create_draft_reply)
///
/// Missing JSON fields deserialize to empty strings so they are reported
/// by validation together with explicitly empty ones. `to_email` and
/// `subject` end up in message headers and must stay on one line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DraftRequest {
    #[validate(custom = "not_blank")]
    pub thread_id: String,

    #[validate(custom = "recipient")]
    pub to_email: String,

    #[validate(custom = "header_text")]
    pub subject: String,

    #[validate(custom = "not_blank")]
    pub body: String,
}

const DRAFT_FIELDS: [&str; 4] = ["thread_id", "to_email", "subject", "body"];

const BLANK: &str = "blank";

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new(BLANK));
    }
    Ok(())
}

fn header_text(value: &str) -> Result<(), validator::ValidationError> {
    not_blank(value)?;
    if value.contains(['\r', '\n']) {
        let mut err = validator::ValidationError::new("line_break");
        err.message = Some("must not contain line breaks".into());
        return Err(err);
    }
    Ok(())
}

/// A single mailbox, either `addr@host` or `Name <addr@host>`
fn recipient(value: &str) -> Result<(), validator::ValidationError> {
    header_text(value)?;
    let (_, address) = parse_mailbox(value);
    if !validator::validate_email(address) {
        let mut err = validator::ValidationError::new("email");
        err.message = Some(format!("'{}' is not a valid email address", address).into());
        return Err(err);
    }
    Ok(())
}

impl DraftRequest {
    pub fn new(
        thread_id: impl Into<String>,
        to_email: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            to_email: to_email.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Check every field before anything reaches the provider.
    ///
    /// Blank fields are reported together, in declaration order. Otherwise
    /// the first malformed field is reported.
    pub fn check(&self) -> Result<(), ValidationError> {
        let errors = match self.validate() {
            Ok(()) => return Ok(()),
            Err(errors) => errors,
        };
        let failed = errors.field_errors();

        let mut blank = Vec::new();
        let mut invalid = None;
        for &field in DRAFT_FIELDS.iter() {
            let Some(err) = failed.get(field).and_then(|errs| errs.first()) else {
                continue;
            };
            if err.code == BLANK {
                blank.push(field.to_string());
            } else if invalid.is_none() {
                invalid = Some((field, err));
            }
        }

        if !blank.is_empty() {
            return Err(ValidationError::MissingFields { fields: blank });
        }

        match invalid {
            Some((field, err)) => Err(ValidationError::InvalidParameter {
                name: field.to_string(),
                message: err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string()),
            }),
            None => Ok(()),
        }
    }
}

/// Outcome of a successful draft creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DraftResult {
    pub success: bool,
    pub draft_id: String,
    pub thread_id: String,
    pub message: String,
}
