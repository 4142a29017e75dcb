use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Sending, editing or reading on the chat platform failed.
    #[error(transparent)]
    Channel(#[from] relay_channels::Error),

    /// The generation stream failed or ended early.
    #[error(transparent)]
    Backend(#[from] relay_providers::Error),

    #[error(transparent)]
    Session(#[from] relay_sessions::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl std::fmt::Display) -> Self {
        Self::Message {
            message: message.to_string(),
        }
    }
}

impl relay_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

relay_common::impl_context!();
