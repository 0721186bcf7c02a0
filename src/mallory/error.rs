use thiserror::Error;

#[derive(Error, Debug)]
pub enum MalloryApiError {
    #[error("Failed to create HTTP client: {0}")]
    HttpClientCreationError(reqwest::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Mallory API error (status {status_code}): {message}")]
    Api { status_code: u16, message: String },

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Invalid identifier '{0}': not usable as a URL path segment")]
    InvalidIdentifier(String),
}

impl MalloryApiError {
    /// HTTP status reported by the upstream API, if the failure came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            MalloryApiError::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// The upstream-provided message, without the status prefix added by `Display`.
    pub fn message(&self) -> String {
        match self {
            MalloryApiError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_authentication_error(&self) -> bool {
        self.status_code() == Some(401)
    }
}
