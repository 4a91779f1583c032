use std::time::Duration;

use thiserror::Error;

/// Failures of a round-trip to one of the editing endpoints.
///
/// Every variant renders as the single message shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Could not reach the server: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Request timed out.")]
    Timeout { after: Duration },

    #[error("The request was cancelled.")]
    Cancelled,

    #[error("The server returned {mime} instead of an image.")]
    UnexpectedBody { mime: String },

    #[error("Invalid upload: {0}")]
    InvalidPart(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

/// Picks the message to show for a non-2xx response body.
///
/// JSON bodies carrying an `error`, `detail` or `message` string use that string;
/// other bodies are shown trimmed. An empty body falls back to the status reason.
pub(crate) fn error_message(reason: &str, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return reason.to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "detail", "message"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }

    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn prefers_json_error_field() {
        assert_eq!(
            error_message("Bad Request", r#"{"error": "No image uploaded"}"#),
            "No image uploaded"
        );
        assert_eq!(
            error_message("Bad Request", r#"{"detail": "prompt missing"}"#),
            "prompt missing"
        );
    }

    #[test]
    fn plain_text_is_used_verbatim() {
        assert_eq!(error_message("Internal Server Error", "model crashed\n"), "model crashed");
    }

    #[test]
    fn empty_body_uses_reason() {
        assert_eq!(error_message("Bad Gateway", "  "), "Bad Gateway");
    }

    #[test]
    fn timeout_message_is_the_same_for_any_duration() {
        for after in [Duration::from_millis(250), Duration::from_secs(60)] {
            assert_eq!(ApiError::Timeout { after }.to_string(), "Request timed out.");
        }
    }
}
