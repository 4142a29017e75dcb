use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Connection failure or a body read that broke off.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// A body line that is not a generation chunk.
    #[error("malformed backend output {line:?}: {source}")]
    Malformed {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// The backend reported a failure in-band (e.g. unknown model).
    #[error("backend error: {message}")]
    Backend { message: String },

    /// The body ended before the terminal chunk.
    #[error("generation stream ended before completion")]
    Truncated,
}

impl Error {
    #[must_use]
    pub fn malformed(line: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Malformed {
            line: line.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
