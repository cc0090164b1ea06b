use thiserror::Error;

pub type IvaultResult<T> = Result<T, IvaultError>;

#[derive(Debug, Error)]
pub enum IvaultError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid chunking parameters: {0}")]
    InvalidParams(String),

    #[error("record decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("logging setup error: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
