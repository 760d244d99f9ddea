//! The escalation trigger: a zero-argument tool the language model invokes
//! when the caller explicitly asks for a human.
//!
//! Invoking it mints a room-scoped operator credential, notifies the
//! operator surface with the join URL, and returns an acknowledgement
//! utterance. It only initiates the handoff; completion is the operator's
//! arrival, observed elsewhere. The tool never propagates an error to the
//! caller: failures become an apology utterance and a logged cause.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;
use tracing::{error, info};

use handoff::{join_url, AccessTokenIssuer, HandoffError, JoinNotification, OperatorNotifier};

const ACK_UTTERANCE: &str = "Of course. I am generating a secure link for a human \
     representative to join our call. Please hold on a moment.";

const ALREADY_REQUESTED_UTTERANCE: &str = "A human representative has already been notified \
     and will join our call shortly. Please stay on the line.";

const APOLOGY_UTTERANCE: &str = "I am sorry, I was not able to reach a human representative \
     just now. Please ask me again in a moment.";

#[derive(Debug, Deserialize)]
pub struct TransferArgs {}

/// Model-invokable escalation trigger, one per session.
pub struct TransferToHumanTool {
    issuer: AccessTokenIssuer,
    room: String,
    meet_url: String,
    ws_url: String,
    notifier: Arc<dyn OperatorNotifier>,
    /// Guards against a second live credential for the same session.
    issued: AtomicBool,
}

impl TransferToHumanTool {
    pub fn new(
        issuer: AccessTokenIssuer,
        room: impl Into<String>,
        meet_url: impl Into<String>,
        ws_url: impl Into<String>,
        notifier: Arc<dyn OperatorNotifier>,
    ) -> Self {
        Self {
            issuer,
            room: room.into(),
            meet_url: meet_url.into(),
            ws_url: ws_url.into(),
            notifier,
            issued: AtomicBool::new(false),
        }
    }

    /// Whether a credential has been issued for this session.
    pub fn credential_issued(&self) -> bool {
        self.issued.load(Ordering::SeqCst)
    }

    fn escalate(&self) -> Result<(), HandoffError> {
        let credential = self.issuer.issue_operator_token(&self.room)?;
        let url = join_url(&self.meet_url, &self.ws_url, &credential.token);
        self.notifier
            .notify(&JoinNotification::new(&self.room, url))?;
        info!(
            room = %self.room,
            identity = %credential.identity,
            "escalation initiated, operator notified"
        );
        Ok(())
    }
}

impl Tool for TransferToHumanTool {
    const NAME: &'static str = "transfer_to_human_agent";
    type Error = HandoffError;
    type Args = TransferArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Call this function ONLY when the user explicitly asks to speak to \
                          a human, a person, a manager, a supervisor, or a live representative."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    async fn call(&self, _args: Self::Args) -> Result<Self::Output, Self::Error> {
        // One credential per session: later invocations are suppressed.
        if self
            .issued
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!(room = %self.room, "escalation already pending, suppressing duplicate");
            return Ok(ALREADY_REQUESTED_UTTERANCE.to_string());
        }

        match self.escalate() {
            Ok(()) => Ok(ACK_UTTERANCE.to_string()),
            Err(e) => {
                error!(room = %self.room, error = %e, "escalation failed");
                // Clear the guard so the caller can verbally retry.
                self.issued.store(false, Ordering::SeqCst);
                Ok(APOLOGY_UTTERANCE.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff::SigningCredentials;
    use std::sync::Mutex;

    struct RecordingNotifier {
        delivered: Mutex<Vec<JoinNotification>>,
        fail: AtomicBool,
    }

    impl RecordingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                delivered: Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
            })
        }

        fn count(&self) -> usize {
            self.delivered.lock().unwrap().len()
        }
    }

    impl OperatorNotifier for RecordingNotifier {
        fn notify(&self, notification: &JoinNotification) -> Result<(), HandoffError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(HandoffError::Notification("sink unavailable".into()));
            }
            self.delivered.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn tool(notifier: Arc<RecordingNotifier>) -> TransferToHumanTool {
        let issuer = AccessTokenIssuer::new(
            SigningCredentials::new("devkey", "devsecret-devsecret").unwrap(),
        );
        TransferToHumanTool::new(
            issuer,
            "room-42",
            "https://meet.livekit.io/custom",
            "wss://example.livekit.cloud",
            notifier,
        )
    }

    #[tokio::test]
    async fn first_invocation_notifies_and_acknowledges() {
        let notifier = RecordingNotifier::new();
        let tool = tool(Arc::clone(&notifier));

        let utterance = tool.call(TransferArgs {}).await.unwrap();
        assert_eq!(utterance, ACK_UTTERANCE);
        assert!(tool.credential_issued());

        assert_eq!(notifier.count(), 1);
        let delivered = notifier.delivered.lock().unwrap();
        assert_eq!(delivered[0].room, "room-42");
        assert!(delivered[0].join_url.contains("token="));
        assert!(delivered[0]
            .join_url
            .contains("liveKitUrl=wss%3A%2F%2Fexample.livekit.cloud"));
    }

    #[tokio::test]
    async fn second_invocation_is_suppressed() {
        let notifier = RecordingNotifier::new();
        let tool = tool(Arc::clone(&notifier));

        tool.call(TransferArgs {}).await.unwrap();
        let utterance = tool.call(TransferArgs {}).await.unwrap();

        assert_eq!(utterance, ALREADY_REQUESTED_UTTERANCE);
        assert_eq!(notifier.count(), 1, "no second credential or notification");
    }

    #[tokio::test]
    async fn failure_yields_apology_and_allows_retry() {
        let notifier = RecordingNotifier::new();
        notifier.fail.store(true, Ordering::SeqCst);
        let tool = tool(Arc::clone(&notifier));

        let utterance = tool.call(TransferArgs {}).await.unwrap();
        assert_eq!(utterance, APOLOGY_UTTERANCE);
        assert!(!tool.credential_issued(), "guard cleared for verbal retry");
        assert_eq!(notifier.count(), 0);

        // The caller asks again once the sink recovers.
        notifier.fail.store(false, Ordering::SeqCst);
        let utterance = tool.call(TransferArgs {}).await.unwrap();
        assert_eq!(utterance, ACK_UTTERANCE);
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn definition_declares_zero_arguments() {
        let notifier = RecordingNotifier::new();
        let tool = tool(notifier);
        let definition = tool.definition(String::new()).await;
        assert_eq!(definition.name, "transfer_to_human_agent");
        assert_eq!(definition.parameters["properties"], serde_json::json!({}));
    }
}
