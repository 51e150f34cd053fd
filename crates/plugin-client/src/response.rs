//! Uniform decoding of backend responses.
//!
//! Every endpoint goes through [`ApiOutcome`], so the error shape is the
//! same everywhere: a success payload, an HTTP failure with status and the
//! optional `detail` the backend attached, or a transport failure.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::ClientError;

/// Tagged result of a single backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiOutcome<T> {
    /// 2xx response with its payload.
    Success(T),
    /// Non-2xx response.
    HttpError {
        status: StatusCode,
        detail: Option<String>,
    },
    /// The request failed before a complete response was read.
    Transport { message: String },
}

/// Error body shape used by the backend (`{"detail": ...}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

impl ApiOutcome<String> {
    /// Decode a sent request into an outcome carrying the raw body text.
    pub async fn from_response(result: Result<reqwest::Response, reqwest::Error>) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                return Self::Transport {
                    message: e.to_string(),
                };
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Self::Transport {
                    message: e.to_string(),
                };
            }
        };
        trace!(status = status.as_u16(), bytes = body.len(), "Backend response");

        Self::from_parts(status, body)
    }

    /// Build an outcome from an already-read status and body.
    pub fn from_parts(status: StatusCode, body: String) -> Self {
        if status.is_success() {
            Self::Success(body)
        } else {
            Self::HttpError {
                status,
                detail: extract_detail(&body),
            }
        }
    }

    /// Parse the success payload as JSON.
    ///
    /// A body that is not valid JSON turns into a transport failure carrying
    /// the parser message.
    pub fn json<T: DeserializeOwned>(self) -> ApiOutcome<T> {
        self.and_then(|body| {
            serde_json::from_str(&body).map_err(|e| ClientError::Transport(e.to_string()))
        })
    }
}

impl<T> ApiOutcome<T> {
    /// HTTP status of a failed response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn and_then<U>(self, f: impl FnOnce(T) -> Result<U, ClientError>) -> ApiOutcome<U> {
        match self {
            Self::Success(value) => match f(value) {
                Ok(value) => ApiOutcome::Success(value),
                Err(e) => ApiOutcome::Transport {
                    message: e.to_string(),
                },
            },
            Self::HttpError { status, detail } => ApiOutcome::HttpError { status, detail },
            Self::Transport { message } => ApiOutcome::Transport { message },
        }
    }

    /// Convert into a plain `Result`.
    pub fn into_result(self) -> Result<T, ClientError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::HttpError { status, detail } => Err(ClientError::Http {
                status: status.as_u16(),
                detail,
            }),
            Self::Transport { message } => Err(ClientError::Transport(message)),
        }
    }
}

fn extract_detail(body: &str) -> Option<String> {
    let body: ErrorBody = serde_json::from_str(body).ok()?;
    match body.detail? {
        serde_json::Value::Null => None,
        serde_json::Value::String(detail) => Some(detail),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Status {
        valid: bool,
    }

    #[test]
    fn test_success_passes_body_through() {
        let outcome = ApiOutcome::<String>::from_parts(StatusCode::OK, "\"abc\"".into());
        assert_eq!(outcome, ApiOutcome::Success("\"abc\"".to_string()));
    }

    #[test]
    fn test_http_error_with_detail() {
        let outcome = ApiOutcome::<String>::from_parts(
            StatusCode::BAD_REQUEST,
            r#"{"detail":"refresh not possible"}"#.into(),
        );
        assert_eq!(
            outcome,
            ApiOutcome::HttpError {
                status: StatusCode::BAD_REQUEST,
                detail: Some("refresh not possible".into()),
            }
        );
    }

    #[test]
    fn test_http_error_without_usable_body() {
        for body in ["", "Internal Server Error", "{}", r#"{"detail":null}"#] {
            let outcome = ApiOutcome::<String>::from_parts(StatusCode::INTERNAL_SERVER_ERROR, body.into());
            assert_eq!(outcome.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
            let err = outcome.into_result().unwrap_err();
            assert_eq!(err.to_string(), "HTTP 500", "body: {body:?}");
        }
    }

    #[test]
    fn test_structured_detail_rendered_as_json() {
        let outcome = ApiOutcome::<String>::from_parts(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"loc":["query","since_time"]}]}"#.into(),
        );
        match outcome {
            ApiOutcome::HttpError { detail, .. } => {
                assert_eq!(detail.as_deref(), Some(r#"[{"loc":["query","since_time"]}]"#));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_json_payload() {
        let outcome = ApiOutcome::<String>::from_parts(StatusCode::OK, r#"{"valid":true}"#.into());
        assert_eq!(outcome.json::<Status>(), ApiOutcome::Success(Status { valid: true }));
    }

    #[test]
    fn test_json_parse_failure_is_transport() {
        let outcome = ApiOutcome::<String>::from_parts(StatusCode::OK, "<html>".into()).json::<Status>();
        assert!(matches!(outcome, ApiOutcome::Transport { .. }));
        assert!(matches!(
            outcome.into_result(),
            Err(ClientError::Transport(_))
        ));
    }

    #[test]
    fn test_json_keeps_http_error() {
        let outcome = ApiOutcome::<String>::from_parts(StatusCode::NOT_FOUND, String::new()).json::<Status>();
        assert_eq!(outcome.status(), Some(StatusCode::NOT_FOUND));
    }
}
