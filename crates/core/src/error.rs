use providers::ProviderError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad request payload; never reaches the index.
    #[error("invalid input: {0}")]
    Input(String),
    #[error("embedding failed: {0}")]
    Embedding(#[from] ProviderError),
    /// Malformed dataset row or inconsistent vector dimensions.
    #[error("data error: {0}")]
    Data(String),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Input(_))
    }
}
