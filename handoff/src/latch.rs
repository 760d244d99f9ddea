//! Single-fire shutdown latch shared across independent event sources.
//!
//! The latch is the only shared mutable state in the handoff core. Operator
//! arrival, session errors, and any future source all converge on one
//! `fire()` call; an atomic compare-and-swap decides the winner, so the
//! exactly-once guarantee holds under true concurrency rather than only
//! under cooperative scheduling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Why the session is being torn down.
///
/// Recorded by the winning `fire()` call and reported back through
/// [`ShutdownLatch::wait`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownCause {
    /// A participant matching the reserved operator namespace joined.
    OperatorArrived { identity: String },
    /// The underlying session reported a terminal error.
    SessionError { message: String },
}

impl std::fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OperatorArrived { identity } => write!(f, "operator `{identity}` arrived"),
            Self::SessionError { message } => write!(f, "session error: {message}"),
        }
    }
}

/// Fire-once idempotent latch.
///
/// Created at session start, fires at most once, awaited by the session
/// coordinator's shutdown path, discarded with the session.
pub struct ShutdownLatch {
    fired: AtomicBool,
    cause: OnceLock<ShutdownCause>,
    token: CancellationToken,
}

impl ShutdownLatch {
    pub fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
            cause: OnceLock::new(),
            token: CancellationToken::new(),
        }
    }

    /// Attempt to fire the latch.
    ///
    /// Returns `true` if this call won the race and its cause was recorded.
    /// All later (or losing) calls observe the latch already fired, record
    /// nothing, and return `false`.
    pub fn fire(&self, cause: ShutdownCause) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(%cause, "shutdown latch already fired, ignoring");
            return false;
        }

        // Winner is unique, so the store cannot fail.
        let _ = self.cause.set(cause);
        self.token.cancel();
        true
    }

    /// Whether the latch has fired.
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// The recorded cause, if the latch has fired.
    pub fn cause(&self) -> Option<&ShutdownCause> {
        self.cause.get()
    }

    /// Wait until the latch fires and return the winning cause.
    ///
    /// Returns immediately if the latch already fired. There is no timeout:
    /// the coordinator waits indefinitely for operator arrival or error.
    pub async fn wait(&self) -> ShutdownCause {
        self.token.cancelled().await;
        // The winning fire() stores the cause before cancelling the token.
        self.cause
            .get()
            .cloned()
            .expect("latch cancelled without a recorded cause")
    }
}

impl Default for ShutdownLatch {
    fn default() -> Self {
        Self::new()
    }
}
