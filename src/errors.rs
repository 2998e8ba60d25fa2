/// Domain-specific error types for the pricing daemon.
/// All external failures must be handled. The daemon must:
/// - Close only the offending connection on protocol errors
/// - Keep serving quotes when persistence fails
/// - Halt only when startup cannot complete
#[derive(Debug, thiserror::Error)]
pub enum PricerError {
    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

impl From<rusqlite::Error> for PricerError {
    fn from(e: rusqlite::Error) -> Self {
        PricerError::Database(e.to_string())
    }
}

impl From<std::io::Error> for PricerError {
    fn from(e: std::io::Error) -> Self {
        PricerError::Io(e.to_string())
    }
}

pub type PricerResult<T> = Result<T, PricerError>;
