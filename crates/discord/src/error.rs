use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Serenity(#[from] serenity::Error),

    #[error("discord token is empty")]
    MissingToken,
}

pub type Result<T> = std::result::Result<T, Error>;
