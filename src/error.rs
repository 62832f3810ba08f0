//! Error types for rsp-tcp

use std::time::Duration;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// rsp-tcp error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file parse error
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Receiver front-end initialization failed. Fatal to the process:
    /// no session can be served without a working receiver.
    #[error("Receiver initialization failed: {0}")]
    DeviceInit(String),

    /// Operation requires an initialized receiver
    #[error("Receiver not initialized")]
    NotInitialized,

    /// Tuner rejected the requested frequency
    #[error("Tuner rejected frequency {0} Hz")]
    FrequencyRejected(u32),

    /// Generic receiver failure (packet read, register access)
    #[error("Receiver error: {0}")]
    Device(String),

    /// The acquisition path produced no samples within the stall timeout
    #[error("No samples produced within {0:?}")]
    ProducerStall(Duration),

    /// Peer closed the data connection
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// Session shutdown requested while an operation was in flight
    #[error("Shutdown requested")]
    Shutdown,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
