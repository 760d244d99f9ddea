//! Error taxonomy for the escalation handoff core.
//!
//! Every error in the handoff path is represented here. Callers can query
//! `is_fatal()` without string matching to decide whether the process may
//! continue.
//!
//! | Variant        | Fatal | Handling                                      |
//! |----------------|-------|-----------------------------------------------|
//! | Configuration  | yes   | abort before any call connects                |
//! | Issuance       | no    | trigger returns an apology utterance          |
//! | Notification   | no    | trigger returns an apology utterance          |
//! | Session        | no    | fires the shutdown latch, session tears down  |

use thiserror::Error;

/// Unified error type for handoff operations.
#[derive(Debug, Error)]
pub enum HandoffError {
    /// Missing or malformed credentials/endpoints. Startup-class: the
    /// process must not start, and this never occurs mid-session.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Credential signing failed despite startup checks. Recovered locally
    /// by the escalation trigger.
    #[error("Credential issuance failed: {0}")]
    Issuance(String),

    /// The join notification could not be delivered to the operator surface.
    #[error("Notification delivery failed: {0}")]
    Notification(String),

    /// The underlying conversational session reported a terminal failure.
    /// Surfaced by firing the shutdown latch; no reconnection is attempted.
    #[error("Session error: {0}")]
    Session(String),
}

impl HandoffError {
    /// Returns `true` if this error must abort the process.
    ///
    /// Only configuration errors are fatal; they can only occur before a
    /// call exists, so aborting has no caller impact.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
