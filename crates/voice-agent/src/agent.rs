//! Support agent definition.
//!
//! The agent answers the caller's questions itself and escalates through
//! the `transfer_to_human_agent` tool only on an explicit request for a
//! human. When to call the tool is the model's decision; the tool's effect
//! lives in `tools::transfer`.

use rig::agent::Agent;
use rig::client::CompletionClient;
use rig::providers::openai;

use crate::tools::TransferToHumanTool;

/// Type alias for agents built from OpenAI-compatible endpoints.
pub type OaiAgent = Agent<openai::completion::CompletionModel>;

const DEFAULT_MAX_TURNS: usize = 10;

pub const SUPPORT_AGENT_PREAMBLE: &str = "\
You are a friendly and helpful customer support agent. \
Your primary goal is to assist the user with their questions. \
If the user indicates they want to speak to a human, use the \
'transfer_to_human_agent' function. Do not try to answer the \
question yourself if they ask for a human. Always be polite.";

/// Build the support agent with the escalation trigger attached.
pub fn build_support_agent(
    client: &openai::CompletionsClient,
    model: &str,
    transfer: TransferToHumanTool,
) -> OaiAgent {
    client
        .agent(model)
        .name("support-agent")
        .description("Customer support voice agent with one-shot human escalation")
        .preamble(SUPPORT_AGENT_PREAMBLE)
        .temperature(0.4)
        .tool(transfer)
        .default_max_turns(DEFAULT_MAX_TURNS)
        .build()
}
