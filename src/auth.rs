//! OAuth2 credentials and Gmail API hub construction

use google_gmail1::common::GetToken;
use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use oauth2::basic::BasicClient;
use oauth2::{AuthType, AuthUrl, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope, TokenUrl};
use std::path::Path;
use yup_oauth2::ApplicationSecret;

use crate::error::{GmailError, Result};
use crate::token::CachedToken;

/// Full mailbox scope, the one the token cache is issued for.
///
/// If this changes, delete the previously saved token cache.
pub const MAIL_SCOPE: &str = "https://mail.google.com/";

/// Opaque `state` value sent with the authorization request
pub const AUTH_STATE: &str = "state-token";

/// Type alias for Gmail Hub to simplify type signatures
pub type GmailHub = Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Install the process-wide rustls crypto provider
///
/// Multiple dependencies enable different providers, so rustls cannot pick one
/// on its own. Calling this more than once is harmless.
pub fn install_crypto_provider() -> Result<()> {
    if rustls::crypto::CryptoProvider::get_default().is_some() {
        return Ok(());
    }

    #[cfg(not(windows))]
    let provider = rustls::crypto::aws_lc_rs::default_provider();
    #[cfg(windows)]
    let provider = rustls::crypto::ring::default_provider();

    // Losing the race to another installer still leaves a provider in place
    if provider.install_default().is_err()
        && rustls::crypto::CryptoProvider::get_default().is_none()
    {
        return Err(GmailError::ConfigError(
            "Failed to install default crypto provider".to_string(),
        ));
    }
    Ok(())
}

/// Load the OAuth2 client secret issued by the Google developer console
///
/// Accepts both `installed` and `web` client files. A file without a redirect
/// URI cannot drive the authorization-code flow and is rejected.
pub async fn load_application_secret(credentials_path: &Path) -> Result<ApplicationSecret> {
    let secret = yup_oauth2::read_application_secret(credentials_path)
        .await
        .map_err(|e| {
            GmailError::ConfigError(format!(
                "Unable to read client secret file {:?}: {}",
                credentials_path, e
            ))
        })?;

    if secret.redirect_uris.is_empty() {
        return Err(GmailError::ConfigError(
            "Missing redirect URI in client secret file".to_string(),
        ));
    }

    tracing::debug!("Loaded OAuth2 client {} from {:?}", secret.client_id, credentials_path);
    Ok(secret)
}

/// First redirect URI of the client, the one used for the code exchange
pub fn redirect_uri(secret: &ApplicationSecret) -> Result<&str> {
    secret
        .redirect_uris
        .first()
        .map(String::as_str)
        .ok_or_else(|| GmailError::ConfigError("Missing redirect URI in client secret file".to_string()))
}

/// OAuth2 client for the authorization-code flow of this application
///
/// Client credentials travel in the token request body, as Google's
/// installed-app endpoint expects.
pub fn oauth_client(secret: &ApplicationSecret) -> Result<BasicClient> {
    let auth_url = AuthUrl::new(secret.auth_uri.clone())
        .map_err(|e| GmailError::ConfigError(format!("Invalid auth_uri {:?}: {}", secret.auth_uri, e)))?;
    let token_url = TokenUrl::new(secret.token_uri.clone()).map_err(|e| {
        GmailError::ConfigError(format!("Invalid token_uri {:?}: {}", secret.token_uri, e))
    })?;
    let redirect = redirect_uri(secret)?;
    let redirect_url = RedirectUrl::new(redirect.to_string())
        .map_err(|e| GmailError::ConfigError(format!("Invalid redirect URI {:?}: {}", redirect, e)))?;

    Ok(BasicClient::new(
        ClientId::new(secret.client_id.clone()),
        Some(ClientSecret::new(secret.client_secret.clone())),
        auth_url,
        Some(token_url),
    )
    .set_auth_type(AuthType::RequestBody)
    .set_redirect_uri(redirect_url))
}

/// Build the consent-page URL the user opens to obtain an authorization code
///
/// Requests offline access so the exchange also yields a refresh token.
pub fn authorization_url(secret: &ApplicationSecret, scopes: &[&str]) -> Result<String> {
    let client = oauth_client(secret)?;
    let (url, _state) = client
        .authorize_url(|| CsrfToken::new(AUTH_STATE.to_string()))
        .add_scopes(scopes.iter().map(|scope| Scope::new(scope.to_string())))
        .add_extra_param("access_type", "offline")
        .url();

    Ok(url.to_string())
}

/// Initialize the Gmail API hub from a token obtained by the token manager
///
/// When the token carries a refresh token, the hub is driven by an
/// authorized-user authenticator that refreshes access tokens as they
/// expire. Otherwise the cached access token is sent as-is.
pub async fn initialize_gmail_hub(
    secret: &ApplicationSecret,
    token: &CachedToken,
) -> Result<GmailHub> {
    match &token.refresh_token {
        Some(refresh_token) => {
            let user_secret = yup_oauth2::authorized_user::AuthorizedUserSecret {
                client_id: secret.client_id.clone(),
                client_secret: secret.client_secret.clone(),
                refresh_token: refresh_token.clone(),
                key_type: "authorized_user".to_string(),
            };

            let auth = yup_oauth2::AuthorizedUserAuthenticator::builder(user_secret)
                .build()
                .await
                .map_err(|e| {
                    GmailError::AuthError(format!("Failed to build authenticator: {}", e))
                })?;

            tracing::debug!("Using refresh-token authenticator");
            build_hub(auth)
        }
        None => {
            tracing::debug!("Cached token has no refresh token, using access token as-is");
            access_token_hub(&token.access_token)
        }
    }
}

/// Gmail hub that sends a fixed access token with every request
pub fn access_token_hub(access_token: &str) -> Result<GmailHub> {
    build_hub(access_token.to_string())
}

fn build_hub<A: GetToken + 'static>(auth: A) -> Result<GmailHub> {
    // Use HTTP/1 for compatibility (HTTP/2 is default but HTTP/1 works better with google-gmail1)
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| {
                    GmailError::AuthError(format!("Failed to load TLS roots: {}", e))
                })?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}

/// Secure token file permissions on Unix systems
///
/// Sets file permissions to 0600 (read/write for owner only)
/// to prevent unauthorized access to OAuth2 tokens
#[cfg(unix)]
pub async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// Windows uses ACLs instead of Unix permission bits; nothing to do here
#[cfg(windows)]
pub async fn secure_token_file(_path: &Path) -> Result<()> {
    Ok(())
}
