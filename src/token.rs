//! Token cache and the interactive authorization-code flow

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use google_gmail1::yup_oauth2::ApplicationSecret;
use oauth2::basic::{BasicClient, BasicTokenType};
use oauth2::{AuthorizationCode, RequestTokenError, TokenResponse};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt};
use tracing::{debug, info};

use crate::auth;
use crate::error::{GmailError, Result};

/// OAuth2 token as stored in the token cache file
///
/// Field names match the `token.json` files written by Google's quickstart
/// tooling, so an existing cache can be reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// JSON file holding the last token obtained by the authorization flow
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the cached token
    pub async fn load(&self) -> Result<CachedToken> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            GmailError::TokenCacheError(format!("Unable to read {:?}: {}", self.path, e))
        })?;

        let token: CachedToken = serde_json::from_str(&content).map_err(|e| {
            GmailError::TokenCacheError(format!("Unable to decode {:?}: {}", self.path, e))
        })?;

        if token.access_token.is_empty() {
            return Err(GmailError::TokenCacheError(format!(
                "{:?} holds an empty access token",
                self.path
            )));
        }

        Ok(token)
    }

    /// Persist the token, replacing any previous content, owner read/write only
    pub async fn save(&self, token: &CachedToken) -> Result<()> {
        let mut json = serde_json::to_vec(token)?;
        json.push(b'\n');

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await.map_err(|e| {
            GmailError::TokenCacheError(format!("Unable to cache oauth token: {}", e))
        })?;
        file.write_all(&json).await?;
        file.flush().await?;

        // mode() only applies on creation
        auth::secure_token_file(&self.path).await?;

        debug!("Saved token to {:?}", self.path);
        Ok(())
    }
}

/// Exchanges an authorization code for a token at the provider's token endpoint
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<CachedToken>;
}

/// [`TokenExchanger`] that redeems the code at the client's `token_uri`
pub struct OAuthTokenExchanger {
    client: BasicClient,
}

impl OAuthTokenExchanger {
    pub fn new(secret: &ApplicationSecret) -> Result<Self> {
        Ok(Self {
            client: auth::oauth_client(secret)?,
        })
    }
}

#[async_trait]
impl TokenExchanger for OAuthTokenExchanger {
    async fn exchange_code(&self, code: &str) -> Result<CachedToken> {
        debug!("Exchanging authorization code");
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(body) => GmailError::AuthError(format!(
                    "Unable to retrieve token from web: {}",
                    body
                )),
                RequestTokenError::Request(err) => GmailError::NetworkError(format!(
                    "Unable to reach token endpoint: {}",
                    err
                )),
                RequestTokenError::Parse(err, body) => GmailError::AuthError(format!(
                    "Unable to decode token response: {}: {}",
                    err,
                    String::from_utf8_lossy(&body).trim()
                )),
                RequestTokenError::Other(message) => GmailError::AuthError(format!(
                    "Unable to retrieve token from web: {}",
                    message
                )),
            })?;

        let token_type = match response.token_type() {
            BasicTokenType::Bearer => default_token_type(),
            BasicTokenType::Mac => "MAC".to_string(),
            BasicTokenType::Extension(other) => other.clone(),
        };

        Ok(CachedToken {
            access_token: response.access_token().secret().clone(),
            token_type,
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expiry: response
                .expires_in()
                .and_then(|ttl| Duration::from_std(ttl).ok())
                .map(|ttl| Utc::now() + ttl),
        })
    }
}

/// Read the first whitespace-delimited word from `input`, skipping blank lines
pub async fn read_authorization_code<R>(input: &mut R) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        let read = input.read_line(&mut line).await.map_err(|e| {
            GmailError::AuthError(format!("Unable to read authorization code: {}", e))
        })?;
        if read == 0 {
            return Err(GmailError::AuthError(
                "Unable to read authorization code: unexpected end of input".to_string(),
            ));
        }
        if let Some(code) = line.split_whitespace().next() {
            return Ok(code.to_string());
        }
    }
}

/// Loads the cached token or falls back to the interactive authorization flow
pub struct TokenManager<E> {
    cache: TokenCache,
    exchanger: E,
    authorization_url: String,
}

impl<E: TokenExchanger> TokenManager<E> {
    pub fn new(cache: TokenCache, exchanger: E, authorization_url: String) -> Self {
        Self {
            cache,
            exchanger,
            authorization_url,
        }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Return a usable token, prompting on `output` and reading `input` only on a cache miss
    ///
    /// A cached token is returned unchanged; expiry is left to the HTTP client.
    pub async fn acquire<R, W>(&self, input: &mut R, output: &mut W) -> Result<CachedToken>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        match self.cache.load().await {
            Ok(token) => {
                debug!("Using cached token from {:?}", self.cache.path());
                return Ok(token);
            }
            Err(e) => info!("No usable cached token ({}), starting authorization flow", e),
        }

        let token = self.authorize(input, output).await?;

        writeln!(output, "Saving credential file to: {}", self.cache.path().display())?;
        output.flush()?;
        self.cache.save(&token).await?;

        Ok(token)
    }

    async fn authorize<R, W>(&self, input: &mut R, output: &mut W) -> Result<CachedToken>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        writeln!(
            output,
            "Go to the following link in your browser then type the authorization code: \n{}",
            self.authorization_url
        )?;
        output.flush()?;

        let code = read_authorization_code(input).await?;
        self.exchanger.exchange_code(&code).await
    }
}
