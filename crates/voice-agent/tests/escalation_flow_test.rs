//! Full escalation scenario: the model invokes the trigger, an operator
//! credential scoped to the live room goes out, the operator's arrival
//! fires the latch, and the session is torn down exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rig::tool::Tool;

use handoff::{
    room_event_channel, spawn_event_watcher, AccessTokenIssuer, HandoffError, JoinNotification,
    OperatorArrivalDetector, OperatorNotifier, RoomEvent, SessionBackend, SessionCoordinator,
    ShutdownCause, ShutdownLatch, SigningCredentials,
};
use voice_agent::tools::transfer::TransferArgs;
use voice_agent::tools::TransferToHumanTool;

struct RecordingNotifier {
    delivered: Mutex<Vec<JoinNotification>>,
}

impl RecordingNotifier {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            delivered: Mutex::new(Vec::new()),
        })
    }
}

impl OperatorNotifier for RecordingNotifier {
    fn notify(&self, notification: &JoinNotification) -> Result<(), HandoffError> {
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

struct CountingBackend {
    closes: AtomicUsize,
}

#[async_trait]
impl SessionBackend for CountingBackend {
    async fn close(&self) -> Result<(), HandoffError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn trigger_to_teardown() {
    let issuer =
        AccessTokenIssuer::new(SigningCredentials::new("devkey", "devsecret-devsecret").unwrap());
    let notifier = RecordingNotifier::new();

    let tool = TransferToHumanTool::new(
        issuer.clone(),
        "room-42",
        "https://meet.livekit.io/custom",
        "wss://example.livekit.cloud",
        notifier.clone(),
    );

    // Model-side: the caller asked for a human.
    let utterance = tool.call(TransferArgs {}).await.unwrap();
    assert!(!utterance.is_empty());

    // Operator-side: one notification, URL carries the encoded endpoint and
    // a token scoped to this room only.
    let delivered = notifier.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    let url = &delivered[0].join_url;
    assert!(url.contains("liveKitUrl=wss%3A%2F%2Fexample.livekit.cloud"));
    let token = url
        .split("token=")
        .nth(1)
        .expect("join URL carries a token parameter");
    assert!(issuer.authorizes_room(token, "room-42").unwrap());
    assert!(!issuer.authorizes_room(token, "room-7").unwrap());
    drop(delivered);

    // A second ask must not mint a second live credential.
    tool.call(TransferArgs {}).await.unwrap();
    assert_eq!(notifier.delivered.lock().unwrap().len(), 1);

    // Coordinator-side: the operator joins; the session closes once.
    let backend = Arc::new(CountingBackend {
        closes: AtomicUsize::new(0),
    });
    let latch = Arc::new(ShutdownLatch::new());
    let coordinator =
        SessionCoordinator::new("room-42", backend.clone(), Arc::clone(&latch));

    let (events, rx) = room_event_channel();
    spawn_event_watcher(Arc::clone(&latch), OperatorArrivalDetector::new(), rx);
    events
        .send(RoomEvent::ParticipantConnected {
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

    // Latch is spent: a late error is observably a no-op.
    assert!(!latch.fire(ShutdownCause::SessionError {
        message: "late".into()
    }));
    assert_eq!(backend.closes.load(Ordering::SeqCst), 1);
}
