use thiserror::Error;

/// Type alias for Result with GmailError
pub type Result<T> = std::result::Result<T, GmailError>;

/// Error types for the sender collection pipeline
///
/// Every variant except [`GmailError::InvalidSender`] is fatal for a run.
#[derive(Error, Debug)]
pub enum GmailError {
    /// Gmail API returned an error
    #[error("Gmail API error: {0}")]
    ApiError(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (403)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Invalid message format or parsing error
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    /// A From header that is not a single RFC 5322 mailbox
    #[error("Unable to parse mail address {value:?}: {reason}")]
    InvalidSender { value: String, reason: String },

    /// Token cache could not be read or decoded
    #[error("Token cache error: {0}")]
    TokenCacheError(String),

    /// Output file could not be opened or written
    #[error("Output error: {0}")]
    OutputError(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl GmailError {
    /// Classify a non-success API response by HTTP status
    fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            404 => GmailError::NotFound(message),
            400 => GmailError::BadRequest(message),
            403 => GmailError::Forbidden(message),
            500..=599 => GmailError::ServerError {
                status: status_code,
                message,
            },
            _ => GmailError::ApiError(message),
        }
    }
}

impl From<google_gmail1::Error> for GmailError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            // HTTP response with status code (non-success responses)
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                let message = format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                );
                GmailError::from_status(status.as_u16(), message)
            }
            // Any non-success response whose body is JSON lands here, e.g.
            // {"error": {"code": 503, "message": "...", "status": "UNAVAILABLE"}}
            google_gmail1::Error::BadRequest(ref body) => {
                let details = &body["error"];
                let message = details["message"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| body.to_string());
                match details["code"].as_u64().and_then(|code| u16::try_from(code).ok()) {
                    Some(code) => GmailError::from_status(code, format!("HTTP {}: {}", code, message)),
                    None => GmailError::BadRequest(message),
                }
            }
            google_gmail1::Error::HttpError(ref err) => {
                GmailError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => GmailError::NetworkError(err.to_string()),
            // MissingToken and friends surface here when the authenticator fails
            google_gmail1::Error::MissingToken(ref err) => {
                GmailError::AuthError(format!("No access token available: {}", err))
            }
            _ => GmailError::ApiError(error.to_string()),
        }
    }
}
