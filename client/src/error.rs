use thiserror::Error;

/// Client error taxonomy. Each class maps to one user-visible policy:
/// auth → redirect to login, not-found → informational empty state,
/// validation → inline next to the field, transient → dismissible alert,
/// parse → logged and replaced with safe defaults.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not signed in or session expired")]
    Auth,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("backend rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Parse(#[from] serde_json::Error),

    #[error("push channel: {0}")]
    Realtime(String),

    #[error(transparent)]
    Storage(#[from] std::io::Error),
}

impl ClientError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> ClientError {
        ClientError::Validation {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
