//! Rig-compatible tools exposed to the support agent's language model.
//!
//! Each tool implements `rig::tool::Tool` and is attached via
//! `AgentBuilder::tool()`. The model decides when to invoke them; the
//! effects live here.

pub mod transfer;

pub use transfer::TransferToHumanTool;
