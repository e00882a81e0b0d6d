//! Gmail API module
//!
//! Contains types, authentication, the mail service capability, and the HTTP client.

pub mod auth;
pub mod client;
pub mod service;
pub mod types;
pub mod utils;
