use agent_provider::CancelReason;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatApiError {
    #[error("API key is required")]
    MissingApiKey,

    #[error("instance id is required")]
    MissingInstanceId,

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0} {1}")]
    Status(StatusCode, String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("error reading stream: {0}")]
    StreamRead(String),

    #[error("instance API error: {0}")]
    Instance(String),

    #[error("retry exhausted after max attempts (status: {}, last_error: {last_error:?})", status_label(.status))]
    RetryExhausted {
        status: Option<StatusCode>,
        last_error: Option<String>,
    },

    #[error("request was cancelled ({0})")]
    Cancelled(CancelReason),
}

impl ChatApiError {
    /// True for the expected, silent outcome of a cancelled request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            Self::Cancelled(reason) => Some(*reason),
            _ => None,
        }
    }
}

fn status_label(status: &Option<StatusCode>) -> String {
    status
        .map(|status| status.as_u16().to_string())
        .unwrap_or_else(|| "n/a".to_owned())
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Message(String),
    Object { message: Option<String> },
}

/// Extracts a human readable message from a non-success response body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.to_string()
        }
    };

    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return fallback();
    };

    match parsed.error {
        Some(ErrorField::Message(message)) if !message.is_empty() => message,
        Some(ErrorField::Object {
            message: Some(message),
        }) if !message.is_empty() => message,
        _ => fallback(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_message_prefers_string_error_field() {
        let message = parse_error_message(
            StatusCode::PAYMENT_REQUIRED,
            r#"{"error":"Not enough agent credits"}"#,
        );
        assert_eq!(message, "Not enough agent credits");
    }

    #[test]
    fn parse_error_message_reads_nested_message() {
        let message = parse_error_message(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"bad instance"}}"#,
        );
        assert_eq!(message, "bad instance");
    }

    #[test]
    fn parse_error_message_falls_back_to_reason_or_body() {
        assert_eq!(
            parse_error_message(StatusCode::BAD_GATEWAY, ""),
            "Bad Gateway"
        );
        assert_eq!(
            parse_error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
    }

    #[test]
    fn cancelled_errors_carry_their_reason() {
        let error = ChatApiError::Cancelled(CancelReason::UserAbort);
        assert!(error.is_cancelled());
        assert_eq!(error.cancel_reason(), Some(CancelReason::UserAbort));
        assert_eq!(error.to_string(), "request was cancelled (user_abort)");
    }
}
