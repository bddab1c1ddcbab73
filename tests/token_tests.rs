//! Token acquisition tests: cache hits, interactive fallback and failure paths

mod common;

use common::{create_test_token, MockTokenExchanger};
use gmail_senders::error::GmailError;
use gmail_senders::token::{TokenCache, TokenManager};
use tempfile::TempDir;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth?access_type=offline&client_id=test-client-id&state=state-token";

fn manager_in(dir: &TempDir, exchanger: MockTokenExchanger) -> TokenManager<MockTokenExchanger> {
    TokenManager::new(
        TokenCache::new(dir.path().join("token.json")),
        exchanger,
        AUTH_URL.to_string(),
    )
}

#[tokio::test]
async fn test_valid_cache_skips_prompt() {
    let dir = TempDir::new().unwrap();
    let cached = create_test_token("ya29.cached");
    TokenCache::new(dir.path().join("token.json"))
        .save(&cached)
        .await
        .unwrap();

    let mut exchanger = MockTokenExchanger::new();
    exchanger.expect_exchange_code().times(0);

    let manager = manager_in(&dir, exchanger);
    let mut input: &[u8] = b"should-not-be-read\n";
    let mut output = Vec::new();

    let token = manager.acquire(&mut input, &mut output).await.unwrap();

    assert_eq!(token, cached);
    assert!(output.is_empty());
    assert_eq!(input, b"should-not-be-read\n");
}

#[tokio::test]
async fn test_missing_cache_runs_interactive_flow() {
    let dir = TempDir::new().unwrap();

    let mut exchanger = MockTokenExchanger::new();
    exchanger
        .expect_exchange_code()
        .withf(|code| code == "the-code")
        .times(1)
        .returning(|_| Ok(create_test_token("ya29.fresh")));

    let manager = manager_in(&dir, exchanger);
    let mut input: &[u8] = b"the-code\n";
    let mut output = Vec::new();

    let token = manager.acquire(&mut input, &mut output).await.unwrap();
    assert_eq!(token.access_token, "ya29.fresh");

    let printed = String::from_utf8(output).unwrap();
    assert!(printed.contains("Go to the following link in your browser"));
    assert!(printed.contains(AUTH_URL));
    assert!(printed.contains("Saving credential file to:"));
    assert!(printed.contains("token.json"));

    let saved = manager.cache().load().await.unwrap();
    assert_eq!(saved, token);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = tokio::fs::metadata(manager.cache().path()).await.unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }
}

#[tokio::test]
async fn test_corrupt_cache_falls_back_to_prompt() {
    let dir = TempDir::new().unwrap();
    tokio::fs::write(dir.path().join("token.json"), "{not json")
        .await
        .unwrap();

    let mut exchanger = MockTokenExchanger::new();
    exchanger
        .expect_exchange_code()
        .times(1)
        .returning(|_| Ok(create_test_token("ya29.replacement")));

    let manager = manager_in(&dir, exchanger);
    let mut input: &[u8] = b"4/code\n";
    let mut output = Vec::new();

    let token = manager.acquire(&mut input, &mut output).await.unwrap();

    assert_eq!(token.access_token, "ya29.replacement");
    assert_eq!(manager.cache().load().await.unwrap().access_token, "ya29.replacement");
}

#[tokio::test]
async fn test_exchange_failure_leaves_no_cache() {
    let dir = TempDir::new().unwrap();

    let mut exchanger = MockTokenExchanger::new();
    exchanger.expect_exchange_code().times(1).returning(|_| {
        Err(GmailError::AuthError(
            "Unable to retrieve token from web: HTTP 400: invalid_grant".to_string(),
        ))
    });

    let manager = manager_in(&dir, exchanger);
    let mut input: &[u8] = b"bad-code\n";
    let mut output = Vec::new();

    let result = manager.acquire(&mut input, &mut output).await;

    assert!(matches!(result, Err(GmailError::AuthError(_))));
    assert!(!manager.cache().path().exists());
    assert!(!String::from_utf8(output).unwrap().contains("Saving credential file"));
}

#[tokio::test]
async fn test_empty_input_fails_without_exchange() {
    let dir = TempDir::new().unwrap();

    let mut exchanger = MockTokenExchanger::new();
    exchanger.expect_exchange_code().never();

    let manager = manager_in(&dir, exchanger);
    let mut input: &[u8] = b"";
    let mut output = Vec::new();

    let result = manager.acquire(&mut input, &mut output).await;

    assert!(matches!(result, Err(GmailError::AuthError(_))));
    assert!(!manager.cache().path().exists());
    // The prompt is still shown before reading
    assert!(String::from_utf8(output).unwrap().contains(AUTH_URL));
}
