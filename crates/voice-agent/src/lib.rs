//! Customer-support voice agent with a one-shot human escalation handoff.
//!
//! The handoff coordination itself (latch, lifecycle, credentials) lives in
//! the `handoff` crate; this crate supplies the surrounding agent process:
//! environment configuration, conversational engine providers, the
//! model-invokable escalation trigger, the LiveKit server-API session
//! backend, and the bootstrap wiring.

pub mod agent;
pub mod config;
pub mod engines;
pub mod session;
pub mod tools;
