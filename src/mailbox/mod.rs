//! Mailbox operations
//!
//! The two operations exposed as tools: reading unread mail and composing
//! draft replies. Both work against any [`MailService`](crate::gmail::service::MailService).

pub mod composer;
pub mod reader;
pub mod types;

pub use composer::create_draft_reply;
pub use reader::{fetch_unread, DEFAULT_MAX_RESULTS};
pub use types::{DraftRequest, DraftResult, EmailMessage};
