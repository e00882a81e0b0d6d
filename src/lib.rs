//! Gmail Draft MCP Server Library
//!
//! A Model Context Protocol (MCP) server that reads unread Gmail messages and
//! creates draft replies in existing threads. It never sends mail.

pub mod config;
pub mod error;
pub mod gmail;
pub mod mailbox;
pub mod mcp;

pub use config::Config;
pub use error::{DraftMcpError, ErrorKind, Result};
