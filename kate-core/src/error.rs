use http::StatusCode;
use thiserror::Error;

/// Unified error type for the Kate admin client.
#[derive(Error, Debug)]
pub enum KateError {
    /// Network, DNS or timeout failure. The detail is kept for logs only.
    #[error("Unable to reach the gateway")]
    Transport(String),

    /// 401 from the control API. Carries the status description.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    ServerStatus { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Rejected input, before anything was sent. Carries the full message.
    #[error("{0}")]
    Validation(String),

    #[error("No policy to inherit: {0}")]
    PolicyUnavailable(String),

    #[error("Another route update is already in progress")]
    Busy,

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl KateError {
    /// Build the error for a non-success HTTP status.
    ///
    /// The message is the status's canonical description ("Not Found",
    /// "Unauthorized", ...), falling back to the numeric code.
    pub fn from_status(status: StatusCode) -> Self {
        let message = status_description(status);
        if status == StatusCode::UNAUTHORIZED {
            KateError::Unauthorized(message)
        } else {
            KateError::ServerStatus {
                status: status.as_u16(),
                message,
            }
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, KateError::Unauthorized(_))
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            KateError::Unauthorized(_) => Some(401),
            KateError::ServerStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Textual description of a status code.
pub fn status_description(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}
