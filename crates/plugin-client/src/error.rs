//! Error types for plugin client operations.

use thiserror::Error;

/// Message shown when the backend has no credential file.
pub const CREDENTIAL_NOT_FOUND_MESSAGE: &str = "No credential file found, please log in first";

/// Errors that can occur while talking to the plugin backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Backend answered with a non-2xx status.
    ///
    /// `detail` carries the backend's `detail` field when the error body had
    /// one; the message always shows the status code.
    #[error("HTTP {status}")]
    Http { status: u16, detail: Option<String> },

    /// Request never completed, or the body could not be read or parsed.
    #[error("{0}")]
    Transport(String),

    /// The credential info endpoint reported no stored credential.
    #[error("{}", CREDENTIAL_NOT_FOUND_MESSAGE)]
    CredentialNotFound,

    /// The QR payload could not be turned into an image.
    #[error(transparent)]
    QrDisplay(#[from] QrDisplayError),

    /// A refresh is already in flight.
    #[error("a credential refresh is already running")]
    Busy,

    /// The base URL could not be assembled.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    /// The backend's `detail` text for an HTTP failure, if it sent a non-empty one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Http {
                detail: Some(detail),
                ..
            } if !detail.is_empty() => Some(detail.as_str()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Reasons a QR payload could not be displayed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QrDisplayError {
    /// Backend sent an empty payload.
    #[error("QR code payload is empty")]
    Empty,

    /// Payload is not valid base64.
    #[error("QR code payload is not valid base64: {0}")]
    Base64(String),

    /// Payload decoded, but is not a PNG image.
    #[error("QR code payload is not a PNG image")]
    NotPng,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_message_shows_status() {
        let err = ClientError::Http {
            status: 500,
            detail: Some("failed to read credential".into()),
        };
        assert_eq!(err.to_string(), "HTTP 500");
        assert_eq!(err.detail(), Some("failed to read credential"));

        let err = ClientError::Http {
            status: 502,
            detail: None,
        };
        assert_eq!(err.to_string(), "HTTP 502");
        assert_eq!(err.detail(), None);

        let err = ClientError::Http {
            status: 400,
            detail: Some(String::new()),
        };
        assert_eq!(err.detail(), None);
        assert_eq!(ClientError::Transport("refused".into()).detail(), None);
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            ClientError::CredentialNotFound.to_string(),
            "No credential file found, please log in first"
        );
    }
}
