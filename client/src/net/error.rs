//! Error taxonomy for backend calls and client-side checks.
//!
//! ERROR HANDLING
//! ==============
//! Mutating operations (login, signup, create) return these to the caller so a
//! form can render them. Passive reads (listing, bootstrap) convert them into a
//! display string on the owning state instead of propagating.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use crate::storage::StorageError;
use crate::util::validation::ValidationErrors;

/// Failure of a backend call or of the checks that guard one.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response was received (connect failure, timeout, body read).
    #[error("request failed: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status or `success: false`.
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// The response body did not match the expected schema.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// A call that requires a session token was attempted without one.
    #[error("authentication required")]
    Unauthenticated,

    /// Client-side validation rejected the input before any request was made.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// Durable session storage could not be read or written.
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// Stable machine-readable code for logs and CLI output.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "E_TRANSPORT",
            Self::Backend { .. } => "E_BACKEND",
            Self::Decode(_) => "E_DECODE",
            Self::Unauthenticated => "E_UNAUTHENTICATED",
            Self::Validation(_) => "E_VALIDATION",
            Self::Storage(_) => "E_STORAGE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    /// Whether re-issuing the same request could plausibly succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Backend { status: 429 | 500..=599, .. })
    }
}
