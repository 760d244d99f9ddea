//! Environment configuration for the voice agent.
//!
//! All required variables are validated together at startup; any absence is
//! a fatal configuration error that aborts before a call exists. Optional
//! variables carry built-in defaults.

use std::path::PathBuf;

use handoff::{HandoffError, SigningCredentials};

const ENV_LIVEKIT_URL: &str = "LIVEKIT_URL";
const ENV_LIVEKIT_WS_URL: &str = "LIVEKIT_WS_URL";
const ENV_LIVEKIT_API_KEY: &str = "LIVEKIT_API_KEY";
const ENV_LIVEKIT_API_SECRET: &str = "LIVEKIT_API_SECRET";
const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const ENV_DEEPGRAM_API_KEY: &str = "DEEPGRAM_API_KEY";

const ENV_MODEL: &str = "VOICE_AGENT_MODEL";
const ENV_MEET_URL: &str = "VOICE_AGENT_MEET_URL";
const ENV_AUDIT_LOG: &str = "VOICE_AGENT_AUDIT_LOG";

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_MEET_URL: &str = "https://meet.livekit.io/custom";
const DEFAULT_AUDIT_LOG: &str = "escalation_log.txt";

const REQUIRED_VARS: &[&str] = &[
    ENV_LIVEKIT_URL,
    ENV_LIVEKIT_WS_URL,
    ENV_LIVEKIT_API_KEY,
    ENV_LIVEKIT_API_SECRET,
    ENV_OPENAI_API_KEY,
    ENV_DEEPGRAM_API_KEY,
];

/// Top-level agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LiveKit server API endpoint (https).
    pub livekit_url: String,
    /// LiveKit websocket endpoint embedded in join URLs.
    pub livekit_ws_url: String,
    pub livekit_api_key: String,
    pub livekit_api_secret: String,
    pub openai_api_key: String,
    pub deepgram_api_key: String,
    /// LLM model name for the support agent.
    pub model: String,
    /// Base meeting URL the operator join link is built on.
    pub meet_url: String,
    /// Durable escalation audit log.
    pub audit_log: PathBuf,
}

impl AgentConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, HandoffError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an explicit lookup function. Missing or blank required
    /// variables are reported together in one error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HandoffError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|name| get(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(HandoffError::Configuration(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let require = |name: &str| -> Result<String, HandoffError> {
            get(name).ok_or_else(|| {
                HandoffError::Configuration(format!("missing required environment variable {name}"))
            })
        };

        Ok(Self {
            livekit_url: require(ENV_LIVEKIT_URL)?,
            livekit_ws_url: require(ENV_LIVEKIT_WS_URL)?,
            livekit_api_key: require(ENV_LIVEKIT_API_KEY)?,
            livekit_api_secret: require(ENV_LIVEKIT_API_SECRET)?,
            openai_api_key: require(ENV_OPENAI_API_KEY)?,
            deepgram_api_key: require(ENV_DEEPGRAM_API_KEY)?,
            model: get(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            meet_url: get(ENV_MEET_URL).unwrap_or_else(|| DEFAULT_MEET_URL.to_string()),
            audit_log: get(ENV_AUDIT_LOG)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIT_LOG)),
        })
    }

    /// Token signing material for the credential issuer.
    pub fn signing_credentials(&self) -> Result<SigningCredentials, HandoffError> {
        SigningCredentials::new(&self.livekit_api_key, &self.livekit_api_secret)
    }
}
