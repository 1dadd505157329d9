//! Error types for the DNS sync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DNS sync system
#[derive(Error, Debug)]
pub enum Error {
    /// Node listing errors (cluster side)
    #[error("Node source error: {0}")]
    NodeSource(String),

    /// DNS provider-related errors
    #[error("DNS provider error: {0}")]
    DnsProvider(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Zone or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// An error wrapped with the operation that produced it
    #[error("{context}: {source}")]
    Context {
        /// What was being attempted
        context: String,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a node source error
    pub fn node_source(msg: impl Into<String>) -> Self {
        Self::NodeSource(msg.into())
    }

    /// Create a DNS provider error
    pub fn dns_provider(msg: impl Into<String>) -> Self {
        Self::DnsProvider(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Wrap this error with a description of the failed operation
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Map a non-success HTTP status from a provider API to an error
    ///
    /// The response body is only included for statuses where it helps
    /// diagnose the failure; authentication failures never echo it.
    pub fn from_status(provider: &str, status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::auth(format!(
                "{provider}: invalid API token or insufficient permissions (status {status})"
            )),
            404 => Self::not_found(format!("{provider}: {body}")),
            409 => Self::provider(
                provider,
                format!("conflict, record modified concurrently (status {status})"),
            ),
            429 => Self::rate_limited(format!("{provider}: retry on next interval (status {status})")),
            500..=599 => Self::provider(
                provider,
                format!("server error (transient): {status} - {body}"),
            ),
            _ => Self::provider(provider, format!("request failed: {status} - {body}")),
        }
    }
}
