//! Draft reply composer

use crate::error::{DraftMcpError, Result, ValidationError};
use crate::gmail::service::MailService;
use crate::gmail::types::{CreateDraftRequest, DraftMessageRequest, Thread};
use crate::gmail::utils::{create_reply_message, encode_raw_message, latest_message_id, ReplyParams};
use crate::mailbox::types::{DraftRequest, DraftResult};

/// Create an unsent reply in `request.thread_id`.
///
/// Fields are checked before any provider call. The thread must exist; the
/// reply references its newest `Message-ID` so mail clients thread it too.
/// Each call creates a new draft.
pub async fn create_draft_reply(
    service: &dyn MailService,
    request: &DraftRequest,
) -> Result<DraftResult> {
    request.check()?;

    let thread = lookup_thread(service, &request.thread_id).await?;
    let in_reply_to = latest_message_id(&thread);

    let raw = create_reply_message(&ReplyParams {
        to: &request.to_email,
        subject: &request.subject,
        body: &request.body,
        in_reply_to: in_reply_to.as_deref(),
    })?;

    let draft = service
        .create_draft(&CreateDraftRequest {
            message: DraftMessageRequest {
                raw: encode_raw_message(&raw),
                thread_id: Some(request.thread_id.clone()),
            },
        })
        .await?;

    if let Some(ref actual) = draft.message.thread_id {
        if actual != &request.thread_id {
            tracing::warn!(
                "Draft {} landed in thread {} instead of {}",
                draft.id,
                actual,
                request.thread_id
            );
        }
    }

    tracing::info!("Created draft {} in thread {}", draft.id, request.thread_id);

    Ok(DraftResult {
        success: true,
        message: format!("Draft reply created with ID: {}", draft.id),
        draft_id: draft.id,
        thread_id: request.thread_id.clone(),
    })
}

/// Gmail answers 404 for unknown thread ids and 400 for malformed ones
async fn lookup_thread(service: &dyn MailService, thread_id: &str) -> Result<Thread> {
    match service.get_thread(thread_id).await {
        Err(DraftMcpError::Remote(e)) if e.status == 404 || e.status == 400 => {
            Err(DraftMcpError::Validation(ValidationError::UnknownThread {
                thread_id: thread_id.to_string(),
            }))
        }
        other => other,
    }
}
