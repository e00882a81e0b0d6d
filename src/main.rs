//! Gmail Draft MCP Server
//!
//! Serves `get_unread_emails` and `create_draft_reply` over MCP stdio.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use gmail_draft_mcp::config::Config;
use gmail_draft_mcp::error::Result;
use gmail_draft_mcp::gmail::auth::Authenticator;
use gmail_draft_mcp::gmail::client::GmailClient;
use gmail_draft_mcp::mcp::server::McpServer;

/// Gmail Draft MCP Server
#[derive(Parser)]
#[command(name = "gmail-draft-mcp")]
#[command(author, version, about = "Gmail MCP server: read unread mail, draft replies")]
struct Cli {
    /// OAuth client keys file (overrides GMAIL_OAUTH_PATH)
    #[arg(long, global = true)]
    oauth_path: Option<PathBuf>,

    /// Stored token file (overrides GMAIL_CREDENTIALS_PATH)
    #[arg(long, global = true)]
    credentials_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdio (default)
    Serve,

    /// Check that OAuth keys and credentials are usable
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries JSON-RPC, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::new()?;
    if let Some(path) = cli.oauth_path {
        config.oauth_path = path;
    }
    if let Some(path) = cli.credentials_path {
        config.credentials_path = path;
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await,
        Commands::Status => report_status(config).await,
    }
}

async fn run_server(config: Config) -> Result<()> {
    let authenticator = Arc::new(Authenticator::new(config.clone()).await?);

    // Serve anyway: each tool call will report the authentication problem
    if !authenticator.is_authenticated().await {
        tracing::warn!(
            "No stored credentials at {}; tool calls will fail until they are provided",
            config.credentials_path.display()
        );
    }
    for scope in authenticator.missing_scopes().await {
        tracing::warn!("Stored token was not granted {}", scope);
    }

    let gmail_client = Arc::new(GmailClient::new(&config, authenticator)?);

    tracing::info!("Gmail draft MCP server ready on stdio");
    let mut server = McpServer::new(gmail_client, config.unread_query.clone());
    server.run_stdio().await
}

async fn report_status(config: Config) -> Result<()> {
    eprintln!("OAuth keys:  {}", describe_path(&config.oauth_path));
    eprintln!("Credentials: {}", describe_path(&config.credentials_path));
    eprintln!("Scopes:      {}", config.scopes.join(" "));

    let authenticator = Authenticator::new(config).await?;
    let missing = authenticator.missing_scopes().await;
    if !missing.is_empty() {
        eprintln!("Not granted: {}", missing.join(" "));
    }

    match authenticator.get_access_token().await {
        Ok(_) => {
            eprintln!("Access token: OK");
            Ok(())
        }
        Err(e) => {
            eprintln!("Access token: {}", e);
            Err(e)
        }
    }
}

fn describe_path(path: &std::path::Path) -> String {
    let state = if path.exists() { "found" } else { "missing" };
    format!("{} ({})", path.display(), state)
}
