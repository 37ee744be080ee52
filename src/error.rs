//! FlowTTS error types
//!
//! Every failure surfaced by the SDK is a [`FlowTTSError`]. Variants are grouped by
//! where the failure originates so callers can branch on the kind (retry network
//! failures, fix input on validation failures) instead of matching on messages.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for FlowTTS operations
pub type FlowTTSResult<T> = Result<T, FlowTTSError>;

/// Category of a transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// TCP/TLS connection could not be established
    Connect,
    /// The exchange exceeded its fixed deadline and was aborted
    Timeout,
    /// The endpoint answered with an HTTP error status and no structured error body
    HttpStatus(u16),
    /// The request could not be sent
    Request,
    /// The response body broke off while being read
    Body,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("connection failed"),
            Self::Timeout => f.write_str("timeout"),
            Self::HttpStatus(status) => write!(f, "HTTP {status}"),
            Self::Request => f.write_str("request failed"),
            Self::Body => f.write_str("response body error"),
        }
    }
}

/// Coarse error classification for branching in calling code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    UnknownVoice,
    Network,
    Protocol,
    Decode,
    Configuration,
}

/// Error type for the FlowTTS client
#[derive(Error, Debug)]
pub enum FlowTTSError {
    // ─────────────────────────────────────────────────────────────────────────────
    // Caller Errors (raised before any I/O)
    // ─────────────────────────────────────────────────────────────────────────────

    /// A synthesis parameter is outside its accepted range
    #[error("Invalid parameter '{parameter}': {message}")]
    Validation {
        parameter: &'static str,
        message: String,
    },

    /// The voice id is in neither the turbo nor the extended voice set
    #[error("Unknown voice ID: {0}. Use voices() to see available voices.")]
    UnknownVoice(String),

    /// Client configuration is missing or malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // ─────────────────────────────────────────────────────────────────────────────
    // Exchange Errors
    // ─────────────────────────────────────────────────────────────────────────────

    /// Connection failure, timeout, or an unstructured HTTP error
    #[error("Network error ({kind}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    /// The API reported a structured error object
    #[error("API error {code}: {message}{}", request_id_suffix(.request_id))]
    Protocol {
        code: String,
        message: String,
        request_id: Option<String>,
        status: Option<u16>,
    },

    /// The response could not be decoded into the expected envelope
    #[error("Failed to decode API response: {0}")]
    Decode(String),
}

impl FlowTTSError {
    /// Create a validation error for a named parameter
    pub fn validation(parameter: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            parameter,
            message: message.into(),
        }
    }

    /// Create a network error of the given kind
    pub fn network(kind: NetworkErrorKind, message: impl fmt::Display) -> Self {
        Self::Network {
            kind,
            message: message.to_string(),
        }
    }

    /// Create a timeout error for an exchange aborted after `after`
    pub fn timeout(after: Duration) -> Self {
        Self::Network {
            kind: NetworkErrorKind::Timeout,
            message: format!("request aborted after {}s", after.as_secs()),
        }
    }

    /// Create a decode error
    pub fn decode(error: impl fmt::Display) -> Self {
        Self::Decode(error.to_string())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::UnknownVoice(_) => ErrorKind::UnknownVoice,
            Self::InvalidConfiguration(_) => ErrorKind::Configuration,
            Self::Network { .. } => ErrorKind::Network,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Check if a fresh call with the same input may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { kind, .. } => match kind {
                NetworkErrorKind::HttpStatus(status) => *status == 429 || *status >= 500,
                _ => true,
            },
            _ => false,
        }
    }

    /// Remote request id, when the API reported one
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Protocol { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}

fn request_id_suffix(request_id: &Option<String>) -> String {
    request_id
        .as_deref()
        .map(|id| format!(" (request id: {id})"))
        .unwrap_or_default()
}

impl From<reqwest::Error> for FlowTTSError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if err.is_connect() {
            NetworkErrorKind::Connect
        } else if err.is_body() || err.is_decode() {
            NetworkErrorKind::Body
        } else {
            NetworkErrorKind::Request
        };
        // Strip the URL so query strings never end up in logs.
        Self::network(kind, err.without_url())
    }
}
