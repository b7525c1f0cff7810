use thiserror::Error;

/// User-facing errors.
///
/// Malformed SQL is never an error: the lexer and splitter degrade
/// gracefully. Only invalid configuration and I/O in the front end surface here.
#[derive(Error, Debug)]
pub enum SplitError {
    #[error("sqlsplit config error: {0}")]
    Config(String),

    #[error("sqlsplit delimiter error: {0}")]
    Delimiter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SplitError>;
