//! Error types shared across the client.
//!
//! Nothing here is fatal: every variant ends up as a `Notice` and the user
//! stays on the current view.

use reqwest::StatusCode;

/// Failures talking to the quiz backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend answered {status} for {path}")]
    Status { status: StatusCode, path: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

/// Failures reading or writing the persisted client state.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("State file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejections raised while editing or submitting a quiz draft.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("Quiz must have at least one question.")]
    LastQuestion,

    #[error("Minimum 2 options required.")]
    MinimumOptions,

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("No such {0}")]
    IndexOutOfRange(&'static str),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

/// Login, registration and logout failures.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Umbrella error for operations that cross several layers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Terminal error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Api(ApiError::Network(err))
    }
}
