use std::error::Error as StdError;
use std::fmt;

/// Failures surfaced by the chat client and conversation session.
///
/// Input errors (`EmptyInput`, `TurnInFlight`) are reported before any
/// network activity. The remaining variants describe transport faults and
/// end the turn that produced them; they are never fatal to the session.
#[derive(Debug)]
pub enum ChatError {
    /// The message was empty or whitespace only.
    EmptyInput,

    /// A reply is still streaming for the previous message.
    TurnInFlight,

    /// No tokio runtime was available to drive the request.
    NoRuntime,

    /// The request could not be sent or the connection failed.
    Request(reqwest::Error),

    /// The provider answered with a non-success status.
    Api {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Formatted error body.
        message: String,
    },

    /// Reading the response body failed part way through.
    Stream(String),

    /// A buffered response did not have the expected shape.
    InvalidResponse(String),
}

impl ChatError {
    /// Whether the error was raised locally without contacting the provider.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ChatError::EmptyInput | ChatError::TurnInFlight | ChatError::NoRuntime
        )
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::EmptyInput => write!(f, "Message is empty"),
            ChatError::TurnInFlight => write!(f, "A reply is still in progress"),
            ChatError::NoRuntime => write!(f, "No async runtime available to send the message"),
            ChatError::Request(err) => write!(f, "Request failed: {err}"),
            ChatError::Api { status, message } => write!(f, "HTTP {status}: {message}"),
            ChatError::Stream(detail) => write!(f, "Stream interrupted: {detail}"),
            ChatError::InvalidResponse(detail) => write!(f, "Unexpected response: {detail}"),
        }
    }
}

impl StdError for ChatError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ChatError::Request(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Request(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_classified() {
        assert!(ChatError::EmptyInput.is_input_error());
        assert!(ChatError::TurnInFlight.is_input_error());
        assert!(!ChatError::Stream("reset".to_string()).is_input_error());
        assert!(!ChatError::Api {
            status: 500,
            message: "boom".to_string()
        }
        .is_input_error());
    }

    #[test]
    fn display_includes_status_and_detail() {
        let err = ChatError::Api {
            status: 401,
            message: "API Error: invalid key".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 401: API Error: invalid key");
        assert_eq!(
            ChatError::Stream("connection reset".to_string()).to_string(),
            "Stream interrupted: connection reset"
        );
    }
}
