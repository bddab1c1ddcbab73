//! Gmail Sender Index
//!
//! Walks every message in a Gmail inbox and records which sender sent which
//! messages, producing a JSON object of sender address → message IDs.
//!
//! # Overview
//!
//! One sequential pipeline:
//! - **Authentication**: OAuth2 client secret loading, a cached token or an
//!   interactive authorization-code exchange
//! - **Scanning**: `messages.list` pagination with one metadata fetch per message
//! - **Aggregation**: `From` header parsing and grouping by bare address
//! - **Output**: the grouped index written as `senders.json`
//!
//! Any API, authentication or output failure aborts the run. A message whose
//! sender cannot be parsed is logged and skipped.
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_senders::{auth, cli, client::ProductionGmailClient, config::Config};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     auth::install_crypto_provider()?;
//!     let config = Config::default();
//!
//!     // Prompts for an authorization code only when token.json is unusable
//!     let (secret, token) = cli::authenticate(&config).await?;
//!     let hub = auth::initialize_gmail_hub(&secret, &token).await?;
//!     let client = ProductionGmailClient::new(hub, config.user_id.clone());
//!
//!     let report = cli::collect_senders(client, &config, indicatif::ProgressBar::hidden()).await?;
//!     println!("{} senders written to {:?}", report.senders, report.output_path);
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - Client secret loading, authorization URL, Gmail hub construction
//! - [`token`] - Token cache and the interactive authorization flow
//! - [`client`] - Gmail API client trait and production implementation
//! - [`scanner`] - Inbox pagination loop
//! - [`senders`] - Sender address parsing, grouping and the output writer
//! - [`cli`] - Command-line interface and pipeline orchestration
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`models`] - Core data structures

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod scanner;
pub mod senders;
pub mod token;

// Re-export commonly used types for convenience
pub use error::{GmailError, Result};

// Core data models
pub use models::{MessageHeader, MessageMetadata, MessagePage};

// Config types
pub use config::Config;

// Client traits
pub use client::{GmailClient, ProductionGmailClient};

// Pipeline types
pub use scanner::{EmailScanner, ScanConfig, ScanSummary};
pub use senders::{parse_sender_address, RecordOutcome, SenderIndex};
pub use token::{CachedToken, TokenCache, TokenExchanger, TokenManager};

// CLI types (for binary usage)
pub use cli::{Cli, FetchReport, ProgressReporter};
