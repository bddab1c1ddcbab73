//! Gmail API client for listing inbox pages and fetching message metadata

use async_trait::async_trait;
use google_gmail1::api::{ListMessagesResponse, Message};
use tracing::debug;

use crate::auth::{GmailHub, MAIL_SCOPE};
use crate::error::{GmailError, Result};
use crate::models::{MessageHeader, MessageMetadata, MessagePage};

/// Trait defining the Gmail operations the scanner needs, for easier testing
#[async_trait]
pub trait GmailClient: Send + Sync {
    /// List one page of message IDs matching `query`
    ///
    /// An empty `page_token` requests the first page.
    async fn list_messages(&self, query: &str, page_size: u32, page_token: &str)
        -> Result<MessagePage>;

    /// Get headers-only metadata for a single message
    async fn get_message_metadata(&self, id: &str) -> Result<MessageMetadata>;
}

/// Gmail client backed by the generated API hub
///
/// Every call is issued once; failures are returned to the caller untouched.
pub struct ProductionGmailClient {
    hub: GmailHub,
    user_id: String,
}

impl ProductionGmailClient {
    pub fn new(hub: GmailHub, user_id: impl Into<String>) -> Self {
        Self {
            hub,
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl GmailClient for ProductionGmailClient {
    async fn list_messages(
        &self,
        query: &str,
        page_size: u32,
        page_token: &str,
    ) -> Result<MessagePage> {
        let mut call = self
            .hub
            .users()
            .messages_list(&self.user_id)
            .q(query)
            .max_results(page_size);

        if !page_token.is_empty() {
            call = call.page_token(page_token);
        }

        let (_, response) = call.add_scope(MAIL_SCOPE).doit().await?;
        Ok(parse_message_page(response))
    }

    async fn get_message_metadata(&self, id: &str) -> Result<MessageMetadata> {
        debug!("Fetching metadata for message {}", id);
        let (_, msg) = self
            .hub
            .users()
            .messages_get(&self.user_id, id)
            .format("metadata")
            .add_scope(MAIL_SCOPE)
            .doit()
            .await?;

        parse_message_metadata(msg)
    }
}

/// Convert a `messages.list` response, dropping references without an ID
fn parse_message_page(response: ListMessagesResponse) -> MessagePage {
    let message_ids = response
        .messages
        .unwrap_or_default()
        .into_iter()
        .filter_map(|msg_ref| msg_ref.id)
        .collect();

    MessagePage {
        message_ids,
        next_page_token: response.next_page_token.unwrap_or_default(),
    }
}

/// Convert a metadata-format message, keeping its top-level headers in order
fn parse_message_metadata(msg: Message) -> Result<MessageMetadata> {
    let id = msg
        .id
        .ok_or_else(|| GmailError::InvalidMessageFormat("Missing message ID".to_string()))?;

    let headers = msg
        .payload
        .and_then(|p| p.headers)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|header| match (header.name, header.value) {
            (Some(name), Some(value)) => Some(MessageHeader { name, value }),
            _ => None,
        })
        .collect();

    Ok(MessageMetadata { id, headers })
}
