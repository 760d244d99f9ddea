//! LiveKit session backend and session wiring.
//!
//! The media transport itself is external; this module talks to the LiveKit
//! server API (twirp RoomService) for the two things the coordinator needs
//! from the transport boundary: participant-join observations and the
//! single room close call. Engine-side failures arrive on the same room
//! event channel via the sender handed out by `run_session`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use handoff::{
    room_event_channel, spawn_event_watcher, AccessTokenIssuer, ConsoleNotifier, HandoffError,
    OperatorArrivalDetector, OperatorNotifier, RoomEvent, SessionBackend, SessionCoordinator,
    ShutdownLatch, ShutdownReport,
};

use crate::agent::build_support_agent;
use crate::config::AgentConfig;
use crate::engines::EngineStack;
use crate::tools::TransferToHumanTool;

/// Consecutive poll failures tolerated before the transport is declared dead.
const MAX_POLL_FAILURES: u32 = 5;

/// Server-side handle to one LiveKit room.
pub struct LiveKitRoom {
    http: reqwest::Client,
    host: String,
    room: String,
    issuer: AccessTokenIssuer,
}

impl LiveKitRoom {
    pub fn new(host: impl Into<String>, room: impl Into<String>, issuer: AccessTokenIssuer) -> Self {
        Self {
            http: reqwest::Client::new(),
            host: host.into(),
            room: room.into(),
            issuer,
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    async fn twirp(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, HandoffError> {
        let token = self.issuer.issue_admin_token(&self.room)?;
        let url = format!(
            "{}/twirp/livekit.RoomService/{method}",
            self.host.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| HandoffError::Session(format!("RoomService {method} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HandoffError::Session(format!(
                "RoomService {method} returned {status}"
            )));
        }
        Ok(response)
    }

    /// Current participant identities in the room.
    pub async fn list_participant_identities(&self) -> Result<Vec<String>, HandoffError> {
        #[derive(Deserialize)]
        struct ParticipantInfo {
            identity: String,
        }
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct ListResponse {
            participants: Vec<ParticipantInfo>,
        }

        let response = self
            .twirp("ListParticipants", json!({ "room": self.room }))
            .await?;
        let payload: ListResponse = response
            .json()
            .await
            .map_err(|e| HandoffError::Session(format!("ListParticipants decode failed: {e}")))?;
        Ok(payload
            .participants
            .into_iter()
            .map(|p| p.identity)
            .collect())
    }
}

#[async_trait]
impl SessionBackend for LiveKitRoom {
    async fn close(&self) -> Result<(), HandoffError> {
        self.twirp("DeleteRoom", json!({ "room": self.room }))
            .await?;
        Ok(())
    }
}

/// Poll the room's participant list and report newly seen identities as
/// join events.
///
/// Each identity is reported at most once. Persistent polling failure is a
/// transport failure and surfaces as a `SessionError` event.
pub fn spawn_participant_watch(
    room: Arc<LiveKitRoom>,
    interval: Duration,
    events: mpsc::Sender<RoomEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut seen: HashSet<String> = HashSet::new();
        let mut failures = 0u32;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match room.list_participant_identities().await {
                Ok(identities) => {
                    failures = 0;
                    for identity in identities {
                        if seen.insert(identity.clone())
                            && events
                                .send(RoomEvent::ParticipantConnected { identity })
                                .await
                                .is_err()
                        {
                            // Consumer gone: the session is shutting down.
                            return;
                        }
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, failures, "participant poll failed");
                    if failures >= MAX_POLL_FAILURES {
                        let _ = events
                            .send(RoomEvent::SessionError {
                                message: format!("participant polling failed {failures}x: {e}"),
                            })
                            .await;
                        return;
                    }
                }
            }
        }
    })
}

/// Wire one session end to end and run it to completion.
///
/// Constructs the engine stack and support agent, attaches the escalation
/// trigger, starts the transport watchers, and hands control to the
/// coordinator. Returns once teardown has completed.
pub async fn run_session(
    config: AgentConfig,
    room_name: &str,
    poll_interval: Duration,
) -> anyhow::Result<ShutdownReport> {
    let issuer = AccessTokenIssuer::new(config.signing_credentials()?);

    let engines = EngineStack::from_config(&config)?;
    info!(engines = %engines.describe(), "conversational engine stack ready");

    let notifier: Arc<dyn OperatorNotifier> =
        Arc::new(ConsoleNotifier::with_audit_file(&config.audit_log));
    let transfer = TransferToHumanTool::new(
        issuer.clone(),
        room_name,
        &config.meet_url,
        &config.livekit_ws_url,
        notifier,
    );

    // The conversational loop drives the agent; it stays alive for the
    // whole session so the model can invoke the escalation trigger.
    let _support_agent = build_support_agent(&engines.llm, &engines.llm_model, transfer);
    debug!(model = %engines.llm_model, "support agent built");

    let backend = Arc::new(LiveKitRoom::new(
        &config.livekit_url,
        room_name,
        issuer.clone(),
    ));
    let latch = Arc::new(ShutdownLatch::new());
    let (events, rx) = room_event_channel();

    spawn_event_watcher(Arc::clone(&latch), OperatorArrivalDetector::new(), rx);
    spawn_participant_watch(Arc::clone(&backend), poll_interval, events.clone());

    let coordinator = SessionCoordinator::new(room_name, backend, latch);
    let report = coordinator.run().await?;
    info!(cause = %report.cause, "agent job finished");
    Ok(report)
}
