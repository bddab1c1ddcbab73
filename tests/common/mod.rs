//! Common test utilities and fixtures

#![allow(dead_code)]

use gmail_senders::client::GmailClient;
use gmail_senders::error::Result;
use gmail_senders::models::{MessageMetadata, MessagePage};
use gmail_senders::token::{CachedToken, TokenExchanger};
use mockall::mock;

/// Create a metadata-only message with a single From header
pub fn create_test_message(id: &str, from: &str) -> MessageMetadata {
    MessageMetadata::new(id)
        .with_header("Subject", "Test Subject")
        .with_header("From", from)
        .with_header("Date", "Mon, 1 Jan 2024 10:00:00 -0800")
}

/// Create a list page with the given IDs and continuation token ("" for the last page)
pub fn create_test_page(ids: &[&str], next_page_token: &str) -> MessagePage {
    MessagePage {
        message_ids: ids.iter().map(|id| id.to_string()).collect(),
        next_page_token: next_page_token.to_string(),
    }
}

pub fn create_test_token(access_token: &str) -> CachedToken {
    CachedToken {
        access_token: access_token.to_string(),
        token_type: "Bearer".to_string(),
        refresh_token: Some("1//refresh".to_string()),
        expiry: None,
    }
}

// Mock implementation of GmailClient for testing
mock! {
    pub GmailClient {}

    #[async_trait::async_trait]
    impl GmailClient for GmailClient {
        async fn list_messages(&self, query: &str, page_size: u32, page_token: &str) -> Result<MessagePage>;
        async fn get_message_metadata(&self, id: &str) -> Result<MessageMetadata>;
    }
}

// Mock token endpoint
mock! {
    pub TokenExchanger {}

    #[async_trait::async_trait]
    impl TokenExchanger for TokenExchanger {
        async fn exchange_code(&self, code: &str) -> Result<CachedToken>;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_message() {
        let msg = create_test_message("msg1", "Test <test@example.com>");
        assert_eq!(msg.id, "msg1");
        assert_eq!(msg.header("From"), Some("Test <test@example.com>"));
    }

    #[test]
    fn test_create_test_page() {
        let page = create_test_page(&["msg1", "msg2"], "token123");
        assert_eq!(page.message_ids.len(), 2);
        assert!(page.has_more());
        assert!(!create_test_page(&[], "").has_more());
    }
}
