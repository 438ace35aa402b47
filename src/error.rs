//! Error types for the logging machinery.
//!
//! None of these ever reach the caller of the logging facade. They are
//! rendered as critical records on the console and nowhere else.

use crate::core::Channel;
use thiserror::Error;

/// Errors that can occur during a single delivery attempt.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote endpoint answered with a non-success status
    #[error("rejected with status {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Rich-text attempt and its plain-text fallback both failed
    #[error("{primary}; plain-text fallback also failed: {fallback}")]
    FallbackFailed {
        primary: Box<NotifyError>,
        fallback: Box<NotifyError>,
    },

    /// An address could not be parsed into a mailbox
    #[error("invalid address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    /// The mail message could not be assembled
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    /// SMTP relay failure
    #[error("SMTP relay failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Local file I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl NotifyError {
    /// Whether the attempt went through the fallback before failing.
    pub fn after_fallback(&self) -> bool {
        matches!(self, Self::FallbackFailed { .. })
    }
}

/// A failure of the logging or notification machinery itself.
#[derive(Debug, Error)]
pub enum MetaError {
    /// A channel group is only partially configured
    #[error("{channel} channel is misconfigured: missing {}", .missing.join(", "))]
    Configuration {
        channel: Channel,
        missing: Vec<&'static str>,
    },

    /// A delivery attempt failed
    #[error("can't deliver to {channel}: {source}")]
    Transport {
        channel: Channel,
        #[source]
        source: NotifyError,
    },

    /// The dispatch machinery failed to start or complete
    #[error("dispatch failed: {0}")]
    Dispatch(String),
}
