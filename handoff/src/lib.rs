//! Handoff coordination core for a voice-call escalation agent.
//!
//! This library provides:
//! - A fire-once shutdown latch shared across independent event sources
//! - The session lifecycle state machine (`Running → Closing → Closed`)
//!   and the coordinator that tears the session down exactly once
//! - Operator arrival detection against the reserved identity namespace
//! - Room-scoped, time-bounded access credentials (LiveKit-compatible
//!   HS256 JWTs) and join-URL construction
//! - The operator-facing notification surface with a durable audit record
//!
//! The real-time media transport and the conversational engines (STT, TTS,
//! LLM, VAD) are external collaborators; they appear here only as the
//! `SessionBackend` seam and the `RoomEvent` channel.

pub mod detector;
pub mod error;
pub mod events;
pub mod latch;
pub mod lifecycle;
pub mod notify;
pub mod token;

pub use detector::{OperatorArrivalDetector, OPERATOR_NAMESPACE};
pub use error::HandoffError;
pub use events::{room_event_channel, RoomEvent};
pub use latch::{ShutdownCause, ShutdownLatch};
pub use lifecycle::{
    spawn_event_watcher, IllegalPhaseTransition, PhaseMachine, PhaseTransition, SessionBackend,
    SessionCoordinator, SessionPhase, ShutdownReport,
};
pub use notify::{ConsoleNotifier, JoinNotification, OperatorNotifier};
pub use token::{join_url, AccessTokenIssuer, IssuedCredential, SigningCredentials, VideoGrant};
