//! Error types for the boshscope plugin

use thiserror::Error;

/// Main error type for the boshscope plugin
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Credentials error: {0}")]
    CredentialsError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PluginError {
    /// Whether the error is a connection-level failure, i.e. the remote
    /// endpoint is not accepting connections at all.
    pub fn is_connect(&self) -> bool {
        match self {
            PluginError::HttpError(e) => e.is_connect() || e.is_timeout(),
            PluginError::IoError(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}
