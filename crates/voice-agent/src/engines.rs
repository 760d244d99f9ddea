//! Conversational engine providers.
//!
//! STT, TTS, LLM, and VAD are external collaborators: each handle here is
//! constructed from a validated credential and wired into the media session
//! before the coordinator attaches. Their internal behavior is opaque to
//! this repository; failures inside them surface as a `SessionError` on the
//! room event channel.

use anyhow::{Context, Result};
use rig::providers::openai;

use handoff::HandoffError;

use crate::config::AgentConfig;

fn require_key(provider: &str, api_key: &str) -> Result<String, HandoffError> {
    if api_key.trim().is_empty() {
        return Err(HandoffError::Configuration(format!(
            "{provider} API key must be non-empty"
        )));
    }
    Ok(api_key.to_string())
}

/// Deepgram speech-to-text handle.
#[derive(Debug, Clone)]
pub struct DeepgramStt {
    api_key: String,
}

impl DeepgramStt {
    pub fn new(api_key: &str) -> Result<Self, HandoffError> {
        Ok(Self {
            api_key: require_key("Deepgram", api_key)?,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

/// OpenAI text-to-speech handle.
#[derive(Debug, Clone)]
pub struct OpenAiTts {
    api_key: String,
    voice: String,
}

impl OpenAiTts {
    pub fn new(api_key: &str) -> Result<Self, HandoffError> {
        Ok(Self {
            api_key: require_key("OpenAI TTS", api_key)?,
            voice: "alloy".to_string(),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }
}

/// Silero voice-activity-detection handle. Loaded locally, no credential.
#[derive(Debug, Clone, Default)]
pub struct SileroVad;

impl SileroVad {
    pub fn load() -> Self {
        Self
    }
}

/// The full engine stack for one session.
pub struct EngineStack {
    /// OpenAI-compatible completions client for the support agent.
    pub llm: openai::CompletionsClient,
    /// Model the support agent runs on.
    pub llm_model: String,
    pub stt: DeepgramStt,
    pub tts: OpenAiTts,
    pub vad: SileroVad,
}

impl EngineStack {
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let llm = openai::CompletionsClient::builder()
            .api_key(&config.openai_api_key)
            .build()
            .context("Failed to build OpenAI completions client")?;

        Ok(Self {
            llm,
            llm_model: config.model.clone(),
            stt: DeepgramStt::new(&config.deepgram_api_key)?,
            tts: OpenAiTts::new(&config.openai_api_key)?,
            vad: SileroVad::load(),
        })
    }

    /// One-line summary for startup logging.
    pub fn describe(&self) -> String {
        format!(
            "llm={} stt=deepgram tts=openai/{} vad=silero",
            self.llm_model,
            self.tts.voice()
        )
    }
}
