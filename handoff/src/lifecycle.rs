//! Session lifecycle — explicit phases, legal transition guards, and the
//! coordinator that tears the session down exactly once.
//!
//! The phase model is deliberately small:
//!
//! ```text
//! Running → Closing → Closed
//! ```
//!
//! `Running` is initial; `Closed` is terminal; there is no way back. Every
//! transition is validated and recorded so the shutdown path is auditable
//! after the fact.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::detector::OperatorArrivalDetector;
use crate::error::HandoffError;
use crate::events::RoomEvent;
use crate::latch::{ShutdownCause, ShutdownLatch};

/// The phases of one conversational session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// The automated agent is live and serving the caller.
    Running,
    /// The shutdown latch fired; teardown is in progress.
    Closing,
    /// Teardown completed — terminal.
    Closed,
}

impl SessionPhase {
    /// Whether this is a terminal phase (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Closing => write!(f, "Closing"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

fn is_legal_transition(from: SessionPhase, to: SessionPhase) -> bool {
    use SessionPhase::*;
    matches!((from, to), (Running, Closing) | (Closing, Closed))
}

/// A single recorded phase transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: SessionPhase,
    pub to: SessionPhase,
    /// Milliseconds since the machine was created.
    pub elapsed_ms: u64,
    /// What caused this transition, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone)]
pub struct IllegalPhaseTransition {
    pub from: SessionPhase,
    pub to: SessionPhase,
}

impl fmt::Display for IllegalPhaseTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal phase transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalPhaseTransition {}

/// Tracks the current phase, enforces legal transitions, and keeps the
/// transition log.
pub struct PhaseMachine {
    current: SessionPhase,
    created_at: Instant,
    transitions: Vec<PhaseTransition>,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            current: SessionPhase::Running,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> SessionPhase {
        self.current
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    /// Attempt to advance to the next phase.
    pub fn advance(
        &mut self,
        to: SessionPhase,
        cause: Option<&str>,
    ) -> Result<(), IllegalPhaseTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalPhaseTransition {
                from: self.current,
                to,
            });
        }

        debug!(from = %self.current, to = %to, "phase transition");
        self.transitions.push(PhaseTransition {
            from: self.current,
            to,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            cause: cause.map(String::from),
        });
        self.current = to;
        Ok(())
    }

    pub fn transitions(&self) -> &[PhaseTransition] {
        &self.transitions
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// The transport-side session handle the coordinator tears down.
///
/// Created by the transport layer before the coordinator attaches. The
/// coordinator invokes `close` at most once and awaits it to completion so
/// that caller-visible resources are released deterministically.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn close(&self) -> Result<(), HandoffError>;
}

/// Outcome of a completed session lifecycle.
#[derive(Debug)]
pub struct ShutdownReport {
    pub cause: ShutdownCause,
    pub transitions: Vec<PhaseTransition>,
}

/// Watch the room event stream and fire the shutdown latch on the first
/// terminal event.
///
/// Participant joins are matched against the operator namespace; anything
/// else is ignored. Losing fire attempts are observable no-ops.
pub fn spawn_event_watcher(
    latch: Arc<ShutdownLatch>,
    detector: OperatorArrivalDetector,
    mut events: mpsc::Receiver<RoomEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                RoomEvent::ParticipantConnected { identity } => {
                    if detector.is_operator(&identity) {
                        info!(identity, "human agent joined, signaling shutdown");
                        latch.fire(ShutdownCause::OperatorArrived { identity });
                    } else {
                        debug!(identity, "participant joined, not an operator");
                    }
                }
                RoomEvent::SessionError { message } => {
                    error!(message, "session reported a terminal error");
                    latch.fire(ShutdownCause::SessionError { message });
                }
            }
        }
        debug!("room event channel closed, watcher exiting");
    })
}

/// Owns the session's termination: awaits the latch, then performs the
/// single close call and drives the phase machine to `Closed`.
pub struct SessionCoordinator {
    room: String,
    backend: Arc<dyn SessionBackend>,
    latch: Arc<ShutdownLatch>,
    machine: PhaseMachine,
}

impl SessionCoordinator {
    pub fn new(
        room: impl Into<String>,
        backend: Arc<dyn SessionBackend>,
        latch: Arc<ShutdownLatch>,
    ) -> Self {
        Self {
            room: room.into(),
            backend,
            latch,
            machine: PhaseMachine::new(),
        }
    }

    pub fn latch(&self) -> Arc<ShutdownLatch> {
        Arc::clone(&self.latch)
    }

    /// Run the session to completion.
    ///
    /// Suspends exactly once, on the latch, with no timeout: the only ways
    /// out are operator arrival and session error. Teardown is awaited to
    /// completion before this returns.
    pub async fn run(mut self) -> Result<ShutdownReport, HandoffError> {
        info!(room = %self.room, "session running, waiting for human handover");
        let cause = self.latch.wait().await;

        info!(room = %self.room, %cause, "shutdown signaled, closing session");
        self.machine
            .advance(SessionPhase::Closing, Some(&cause.to_string()))
            .map_err(|e| HandoffError::Session(e.to_string()))?;

        self.backend.close().await?;

        self.machine
            .advance(SessionPhase::Closed, None)
            .map_err(|e| HandoffError::Session(e.to_string()))?;
        info!(room = %self.room, "session closed");

        Ok(ShutdownReport {
            cause,
            transitions: self.machine.transitions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::room_event_channel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        closes: AtomicUsize,
    }

    impl CountingBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                closes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SessionBackend for CountingBackend {
        async fn close(&self) -> Result<(), HandoffError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn phase_machine_happy_path() {
        let mut machine = PhaseMachine::new();
        assert_eq!(machine.current(), SessionPhase::Running);
        assert!(!machine.is_terminal());

        machine
            .advance(SessionPhase::Closing, Some("operator arrived"))
            .unwrap();
        machine.advance(SessionPhase::Closed, None).unwrap();

        assert!(machine.is_terminal());
        assert_eq!(machine.transitions().len(), 2);
        assert_eq!(
            machine.transitions()[0].cause.as_deref(),
            Some("operator arrived")
        );
    }

    #[test]
    fn phase_machine_rejects_skip_and_backward() {
        let mut machine = PhaseMachine::new();

        // Cannot skip straight to Closed.
        let err = machine.advance(SessionPhase::Closed, None).unwrap_err();
        assert_eq!(err.from, SessionPhase::Running);
        assert_eq!(err.to, SessionPhase::Closed);

        machine.advance(SessionPhase::Closing, None).unwrap();
        machine.advance(SessionPhase::Closed, None).unwrap();

        // No transition back to Running from terminal.
        assert!(machine.advance(SessionPhase::Running, None).is_err());
        assert!(machine.advance(SessionPhase::Closing, None).is_err());
    }

    #[tokio::test]
    async fn operator_arrival_closes_session_exactly_once() {
        let backend = CountingBackend::new();
        let latch = Arc::new(ShutdownLatch::new());
        let coordinator =
            SessionCoordinator::new("room-42", backend.clone(), Arc::clone(&latch));

        let (tx, rx) = room_event_channel();
        spawn_event_watcher(Arc::clone(&latch), OperatorArrivalDetector::new(), rx);

        // A caller join must not trigger shutdown.
        tx.send(RoomEvent::ParticipantConnected {
            identity: "caller-123".into(),
        })
        .await
        .unwrap();
        tx.send(RoomEvent::ParticipantConnected {
            identity: "human-agent-20240615_120000".into(),
        })
        .await
        .unwrap();

        let report = coordinator.run().await.unwrap();
        assert_eq!(backend.closes.load(Ordering::SeqCst), 1);
        assert_eq!(
            report.cause,
            ShutdownCause::OperatorArrived {
                identity: "human-agent-20240615_120000".into()
            }
        );
        assert_eq!(report.transitions.len(), 2);
    }

    #[tokio::test]
    async fn session_error_closes_session() {
        let backend = CountingBackend::new();
        let latch = Arc::new(ShutdownLatch::new());
        let coordinator =
            SessionCoordinator::new("room-9", backend.clone(), Arc::clone(&latch));

        let (tx, rx) = room_event_channel();
        spawn_event_watcher(Arc::clone(&latch), OperatorArrivalDetector::new(), rx);

        tx.send(RoomEvent::SessionError {
            message: "stt stream dropped".into(),
        })
        .await
        .unwrap();

        let report = coordinator.run().await.unwrap();
        assert_eq!(backend.closes.load(Ordering::SeqCst), 1);
        assert!(matches!(report.cause, ShutdownCause::SessionError { .. }));
    }

    #[tokio::test]
    async fn close_is_awaited_and_its_error_propagates() {
        let mut backend = MockSessionBackend::new();
        backend
            .expect_close()
            .times(1)
            .returning(|| Err(HandoffError::Session("close failed".into())));

        let latch = Arc::new(ShutdownLatch::new());
        let coordinator =
            SessionCoordinator::new("room-1", Arc::new(backend), Arc::clone(&latch));

        latch.fire(ShutdownCause::SessionError {
            message: "boom".into(),
        });
        let err = coordinator.run().await.unwrap_err();
        assert!(matches!(err, HandoffError::Session(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_error_and_arrival_cause_one_teardown() {
        for _ in 0..20 {
            let backend = CountingBackend::new();
            let latch = Arc::new(ShutdownLatch::new());
            let coordinator =
                SessionCoordinator::new("room-7", backend.clone(), Arc::clone(&latch));

            let fire_a = {
                let latch = Arc::clone(&latch);
                tokio::spawn(async move {
                    latch.fire(ShutdownCause::OperatorArrived {
                        identity: "human-agent-now".into(),
                    })
                })
            };
            let fire_b = {
                let latch = Arc::clone(&latch);
                tokio::spawn(async move {
                    latch.fire(ShutdownCause::SessionError {
                        message: "near-simultaneous".into(),
                    })
                })
            };

            let report = coordinator.run().await.unwrap();
            let wins = [fire_a.await.unwrap(), fire_b.await.unwrap()]
                .iter()
                .filter(|w| **w)
                .count();

            assert_eq!(wins, 1, "the losing fire must be a no-op");
            assert_eq!(backend.closes.load(Ordering::SeqCst), 1);
            // The report's cause is whichever source won the race.
            assert!(latch.cause().is_some());
            assert_eq!(report.transitions.len(), 2);
        }
    }
}
