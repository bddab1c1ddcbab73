//! Inbox scanner: walks `messages.list` pages and files every message by sender

use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::client::GmailClient;
use crate::error::Result;
use crate::senders::{RecordOutcome, SenderIndex};

/// Query and page size for one scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub query: String,
    pub page_size: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            query: "in:inbox".to_string(),
            page_size: crate::config::MAX_PAGE_SIZE,
        }
    }
}

impl From<&crate::config::Config> for ScanConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            query: config.query.clone(),
            page_size: config.page_size,
        }
    }
}

/// Counters collected while scanning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub pages: usize,
    pub messages_listed: usize,
    pub messages_recorded: usize,
    pub messages_skipped: usize,
}

/// Sequential inbox scanner
///
/// One list request per page, then one metadata request per listed message.
/// The first failing request aborts the scan.
pub struct EmailScanner<C> {
    client: C,
    progress: ProgressBar,
}

impl<C: GmailClient> EmailScanner<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report scanned-message counts on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Scan every page matching `config` into `index`
    pub async fn scan_into(&self, config: &ScanConfig, index: &mut SenderIndex) -> Result<ScanSummary> {
        let mut summary = ScanSummary::default();
        let mut page_token = String::new();

        loop {
            let page = self
                .client
                .list_messages(&config.query, config.page_size, &page_token)
                .await?;
            summary.pages += 1;

            info!("Found {} messages", page.message_ids.len());
            debug!(
                "Page {} has_more={} next_page_token={:?}",
                summary.pages,
                page.has_more(),
                page.next_page_token
            );

            for id in &page.message_ids {
                let message = self.client.get_message_metadata(id).await?;
                summary.messages_listed += 1;

                match index.record(&message) {
                    RecordOutcome::Recorded(_) => summary.messages_recorded += 1,
                    RecordOutcome::MissingFrom | RecordOutcome::Unparseable => {
                        summary.messages_skipped += 1
                    }
                }

                self.progress.inc(1);
                self.progress.set_message(format!(
                    "{} senders, page {}",
                    index.sender_count(),
                    summary.pages
                ));
            }

            if !page.has_more() {
                break;
            }
            page_token = page.next_page_token;
        }

        info!(
            "Scan complete: {} pages, {} messages, {} skipped",
            summary.pages, summary.messages_listed, summary.messages_skipped
        );
        Ok(summary)
    }

    /// Scan every page matching `config` into a fresh index
    pub async fn scan(&self, config: &ScanConfig) -> Result<(SenderIndex, ScanSummary)> {
        let mut index = SenderIndex::new();
        let summary = self.scan_into(config, &mut index).await?;
        Ok((index, summary))
    }
}
