//! Error types for blackhole-dns
//!
//! Responder errors live in [`crate::dns::error`]; this module adds the
//! process-level wrapper and configuration loading errors.

use std::io;

use thiserror::Error;

use crate::dns::DnsError;

/// Top-level error type for blackhole-dns
#[derive(Debug, Error)]
pub enum BlackholeError {
    /// Configuration errors (file parsing, validation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Responder errors (bind, serve)
    #[error("DNS error: {0}")]
    Dns(#[from] DnsError),

    /// I/O errors not covered by other categories
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BlackholeError {
    /// Check if this error is recoverable (can retry operation)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Dns(e) => e.is_recoverable(),
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::ConnectionReset
            ),
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error (invalid values, missing required fields)
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Environment variable error
    #[error("Environment variable error: {name}: {reason}")]
    EnvError { name: String, reason: String },

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    IoError(#[from] io::Error),
}

impl ConfigError {
    /// Config errors are generally not recoverable without user intervention
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        false
    }
}

impl From<DnsError> for ConfigError {
    fn from(err: DnsError) -> Self {
        match err.field() {
            Some(field) => Self::ValidationError(format!("{field}: {err}")),
            None => Self::ValidationError(err.to_string()),
        }
    }
}

/// Result alias for process-level operations
pub type Result<T> = std::result::Result<T, BlackholeError>;
