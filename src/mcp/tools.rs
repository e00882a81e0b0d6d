//! MCP Tool definitions and handlers
//!
//! Defines the two mailbox tools and maps their outcomes onto tool results.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::gmail::MAX_RESULTS_LIMIT;
use crate::error::{DraftMcpError, McpError, ValidationError};
use crate::gmail::service::MailService;
use crate::mailbox::{self, DraftRequest, DEFAULT_MAX_RESULTS};
use crate::mcp::types::{CallToolResult, Tool};

pub const GET_UNREAD_EMAILS: &str = "get_unread_emails";
pub const CREATE_DRAFT_REPLY: &str = "create_draft_reply";

/// Tool handler
pub struct ToolHandler {
    service: Arc<dyn MailService>,
    unread_query: String,
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(service: Arc<dyn MailService>, unread_query: impl Into<String>) -> Self {
        Self {
            service,
            unread_query: unread_query.into(),
        }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            tool_def(
                GET_UNREAD_EMAILS,
                "Lists unread emails, newest first, with sender, recipient, subject, snippet, body and date. Does not mark anything as read.",
                get_unread_emails_schema(),
            ),
            tool_def(
                CREATE_DRAFT_REPLY,
                "Creates an unsent draft reply in an existing thread. The draft is never sent by this tool.",
                create_draft_reply_schema(),
            ),
        ]
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        let outcome = match name {
            GET_UNREAD_EMAILS => self.handle_get_unread_emails(args).await,
            CREATE_DRAFT_REPLY => self.handle_create_draft_reply(args).await,
            _ => Err(McpError::UnknownTool {
                name: name.to_string(),
            }
            .into()),
        };

        match outcome {
            Ok(value) => CallToolResult::structured(value),
            Err(e) => {
                tracing::warn!("Tool {} failed: {}", name, e);
                error_result(&e)
            }
        }
    }

    // ==================== Tool Handlers ====================

    async fn handle_get_unread_emails(&self, args: Value) -> Result<Value, DraftMcpError> {
        #[derive(Deserialize)]
        struct Args {
            #[serde(alias = "maxResults")]
            max_results: Option<u32>,
        }

        let args: Args = parse_args(args)?;
        let max_results = args.max_results.unwrap_or(DEFAULT_MAX_RESULTS);

        let messages =
            mailbox::fetch_unread(self.service.as_ref(), &self.unread_query, max_results).await?;

        tracing::info!("Returning {} unread message(s)", messages.len());
        Ok(json!({ "messages": messages }))
    }

    async fn handle_create_draft_reply(&self, args: Value) -> Result<Value, DraftMcpError> {
        let request: DraftRequest = parse_args(args)?;

        let result = mailbox::create_draft_reply(self.service.as_ref(), &request).await?;
        Ok(serde_json::to_value(result)?)
    }
}

/// Decode tool arguments; absent arguments count as an empty object
fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, DraftMcpError> {
    let args = if args.is_null() { json!({}) } else { args };

    serde_json::from_value(args).map_err(|e| {
        DraftMcpError::Validation(ValidationError::InvalidParameter {
            name: "arguments".to_string(),
            message: e.to_string(),
        })
    })
}

/// Failure result with the error category spelled out for the caller
pub fn error_result(err: &DraftMcpError) -> CallToolResult {
    let mut detail = json!({
        "kind": err.kind().as_str(),
        "message": err.to_string(),
        "retryable": err.is_retryable(),
    });
    if let Some(status) = err.status() {
        detail["status"] = json!(status);
    }

    CallToolResult::error(err.to_string()).with_structured(json!({ "error": detail }))
}

// ==================== Schema Definitions ====================

fn tool_def(name: &str, description: &str, schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: schema,
    }
}

fn get_unread_emails_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "max_results": {
                "type": "integer",
                "minimum": 1,
                "maximum": MAX_RESULTS_LIMIT,
                "default": DEFAULT_MAX_RESULTS,
                "description": "Maximum number of unread emails to return"
            }
        }
    })
}

fn create_draft_reply_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "thread_id": {
                "type": "string",
                "description": "Thread to reply in (threadId from get_unread_emails)"
            },
            "to_email": {
                "type": "string",
                "description": "Recipient address, bare or as 'Name <address>'"
            },
            "subject": {
                "type": "string",
                "description": "Subject line"
            },
            "body": {
                "type": "string",
                "description": "Plain text body"
            }
        },
        "required": ["thread_id", "to_email", "subject", "body"]
    })
}
