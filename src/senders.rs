//! Grouping of message IDs by sender address and the `senders.json` writer

use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{GmailError, Result};
use crate::models::MessageMetadata;

/// Header the sender is taken from (exact, case-sensitive match)
pub const FROM_HEADER: &str = "From";

/// Parse a header value as a single RFC 5322 mailbox and return its bare address
///
/// `"Alice <alice@example.com>"` yields `alice@example.com`; the display name
/// and any comments are discarded.
pub fn parse_sender_address(value: &str) -> Result<String> {
    let stripped = strip_comments(value);
    let mailbox: Mailbox = stripped.trim().parse().map_err(|e| GmailError::InvalidSender {
        value: value.to_string(),
        reason: format!("{}", e),
    })?;
    Ok(mailbox.email.to_string())
}

/// Replace each (possibly nested) comment with a single space
///
/// Parentheses inside quoted strings and escaped characters are kept as-is.
fn strip_comments(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut depth = 0usize;
    let mut quoted = false;
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next();
                if depth == 0 {
                    out.push(c);
                    out.extend(escaped);
                }
            }
            '"' if depth == 0 => {
                quoted = !quoted;
                out.push(c);
            }
            '(' if !quoted => depth += 1,
            ')' if !quoted && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    out.push(' ');
                }
            }
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }

    out
}

/// What happened to a message handed to [`SenderIndex::record`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Appended under this sender address
    Recorded(String),
    /// No `From` header at all
    MissingFrom,
    /// `From` header present but not a mailbox
    Unparseable,
}

/// Sender address → message IDs in discovery order
///
/// Serializes as a plain JSON object with keys in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderIndex {
    senders: BTreeMap<String, Vec<String>>,
}

impl SenderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a message under its sender
    ///
    /// Only the first `From` header counts, so each message lands under at
    /// most one key. Messages without a usable sender are skipped.
    pub fn record(&mut self, message: &MessageMetadata) -> RecordOutcome {
        let Some(from) = message.header(FROM_HEADER) else {
            debug!("Message {} has no From header, skipping", message.id);
            return RecordOutcome::MissingFrom;
        };

        match parse_sender_address(from) {
            Ok(address) => {
                self.senders
                    .entry(address.clone())
                    .or_default()
                    .push(message.id.clone());
                RecordOutcome::Recorded(address)
            }
            Err(e) => {
                warn!("Skipping message {}: {}", message.id, e);
                RecordOutcome::Unparseable
            }
        }
    }

    pub fn messages_from(&self, address: &str) -> Option<&[String]> {
        self.senders.get(address).map(Vec::as_slice)
    }

    pub fn sender_count(&self) -> usize {
        self.senders.len()
    }

    pub fn message_count(&self) -> usize {
        self.senders.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.senders.iter()
    }
}

/// Write the index as one JSON object, replacing any previous file content
pub async fn write_senders(path: &Path, index: &SenderIndex) -> Result<()> {
    let mut json = serde_json::to_vec(index)?;
    json.push(b'\n');

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o644);

    let mut file = options.open(path).await.map_err(|e| {
        GmailError::OutputError(format!("Unable to open senders file {:?}: {}", path, e))
    })?;
    file.write_all(&json).await.map_err(|e| {
        GmailError::OutputError(format!("Unable to write senders file {:?}: {}", path, e))
    })?;
    file.flush().await?;

    debug!(
        "Wrote {} senders ({} messages) to {:?}",
        index.sender_count(),
        index.message_count(),
        path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn from_message(id: &str, from: &str) -> MessageMetadata {
        MessageMetadata::new(id).with_header("From", from)
    }

    #[test]
    fn test_parse_sender_address_strips_display_name() {
        assert_eq!(
            parse_sender_address("Alice Example <alice@example.com>").unwrap(),
            "alice@example.com"
        );
        assert_eq!(
            parse_sender_address("\"Smith, Jane\" <jane.smith@example.org>").unwrap(),
            "jane.smith@example.org"
        );
        assert_eq!(
            parse_sender_address("<admin@test.org>").unwrap(),
            "admin@test.org"
        );
    }

    #[test]
    fn test_parse_sender_address_bare() {
        assert_eq!(
            parse_sender_address("bob@example.com").unwrap(),
            "bob@example.com"
        );
        assert_eq!(
            parse_sender_address("  bob@example.com \r\n").unwrap(),
            "bob@example.com"
        );
    }

    #[test]
    fn test_parse_sender_address_ignores_comments() {
        assert_eq!(
            parse_sender_address("alice@example.com (Alice Smith)").unwrap(),
            "alice@example.com"
        );
        assert_eq!(
            parse_sender_address("Alice <alice@example.com> (via list)").unwrap(),
            "alice@example.com"
        );
        assert_eq!(
            parse_sender_address("(Bob) bob@example.com").unwrap(),
            "bob@example.com"
        );
        assert_eq!(
            parse_sender_address("carol@example.com (outer (nested) comment)").unwrap(),
            "carol@example.com"
        );
    }

    #[test]
    fn test_strip_comments_keeps_quoted_parens() {
        assert_eq!(
            strip_comments("\"Jane (Sales)\" <jane@example.org> (work)").trim(),
            "\"Jane (Sales)\" <jane@example.org>"
        );
        assert_eq!(strip_comments("a@b.c (x \\) y)"), "a@b.c  ");
    }

    #[test]
    fn test_record_sender_with_comments() {
        let mut index = SenderIndex::new();
        index.record(&from_message("id1", "alice@example.com (Alice Smith)"));
        index.record(&from_message("id2", "Alice <alice@example.com> (via list)"));
        index.record(&from_message("id3", "(Bob) bob@example.com"));

        assert_eq!(index.message_count(), 3);
        assert_eq!(index.messages_from("alice@example.com").unwrap().len(), 2);
        assert_eq!(
            index.messages_from("bob@example.com").unwrap(),
            &["id3".to_string()]
        );
    }

    #[test]
    fn test_parse_sender_address_rejects_garbage() {
        for value in ["", "not an address", "Broken <missing-at-sign>", "Undisclosed"] {
            let result = parse_sender_address(value);
            assert!(
                matches!(result, Err(GmailError::InvalidSender { .. })),
                "expected {:?} to be rejected",
                value
            );
        }
    }

    #[test]
    fn test_record_groups_in_discovery_order() {
        let mut index = SenderIndex::new();
        index.record(&from_message("id1", "A <a@example.com>"));
        index.record(&from_message("id2", "b@example.com"));
        index.record(&from_message("id3", "a@example.com"));

        assert_eq!(
            index.messages_from("a@example.com").unwrap(),
            &["id1".to_string(), "id3".to_string()]
        );
        assert_eq!(index.sender_count(), 2);
        assert_eq!(index.message_count(), 3);
    }

    #[test]
    fn test_record_keeps_duplicate_ids() {
        let mut index = SenderIndex::new();
        index.record(&from_message("id1", "a@example.com"));
        index.record(&from_message("id1", "a@example.com"));
        assert_eq!(index.messages_from("a@example.com").unwrap().len(), 2);
    }

    #[test]
    fn test_record_skips_missing_and_unparseable() {
        let mut index = SenderIndex::new();

        let no_from = MessageMetadata::new("id1").with_header("Subject", "hi");
        assert_eq!(index.record(&no_from), RecordOutcome::MissingFrom);

        let lowercase = MessageMetadata::new("id2").with_header("from", "a@example.com");
        assert_eq!(index.record(&lowercase), RecordOutcome::MissingFrom);

        let garbage = from_message("id3", "not an address");
        assert_eq!(index.record(&garbage), RecordOutcome::Unparseable);

        assert!(index.is_empty());
    }

    #[test]
    fn test_record_first_from_header_wins() {
        let mut index = SenderIndex::new();
        let msg = MessageMetadata::new("id1")
            .with_header("From", "first@example.com")
            .with_header("From", "second@example.com");

        assert_eq!(
            index.record(&msg),
            RecordOutcome::Recorded("first@example.com".to_string())
        );
        assert!(index.messages_from("second@example.com").is_none());
        assert_eq!(index.message_count(), 1);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut index = SenderIndex::new();
        index.record(&from_message("id2", "z@example.com"));
        index.record(&from_message("id1", "a@example.com"));

        let json = serde_json::to_string(&index).unwrap();
        assert_eq!(json, r#"{"a@example.com":["id1"],"z@example.com":["id2"]}"#);
    }

    #[tokio::test]
    async fn test_write_senders_truncates_previous_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("senders.json");
        tokio::fs::write(&path, format!("{{\"old@example.com\":[\"{}\"]}}\n", "x".repeat(500)))
            .await
            .unwrap();

        let mut index = SenderIndex::new();
        index.record(&from_message("id1", "a@example.com"));
        write_senders(&path, &index).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "{\"a@example.com\":[\"id1\"]}\n");

        let parsed: SenderIndex = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, index);
    }

    #[tokio::test]
    async fn test_write_senders_empty_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("senders.json");

        write_senders(&path, &SenderIndex::new()).await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "{}\n");
    }

    #[tokio::test]
    async fn test_write_senders_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("senders.json");

        let result = write_senders(&path, &SenderIndex::new()).await;
        assert!(matches!(result, Err(GmailError::OutputError(_))));
    }
}
