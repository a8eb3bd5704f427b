use thiserror::Error;

/// Errors raised while parsing or computing content hashes.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("invalid content hash: {0}")]
    Invalid(String),

    #[error("failed to read content: {0}")]
    Io(#[from] std::io::Error),
}
