use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Wire errors
    #[error("Frame too large: {size} bytes (max {max_size})")]
    FrameTooLarge { size: usize, max_size: usize },

    #[error("Serialization failed: {0}")]
    Serialization(String),

    // Domain errors
    #[error("Invalid scan mode: {0}")]
    InvalidScanMode(String),

    #[error("Invalid activation duration: {0}")]
    InvalidDuration(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
