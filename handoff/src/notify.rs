//! Operator-facing notification surface.
//!
//! A `JoinNotification` is emitted exactly once per escalation. The
//! reference surface is the console (a framed banner a human can act on),
//! but anything that delivers the URL intact satisfies the trait. Every
//! delivery is also recorded through `tracing` for audit.

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::HandoffError;

/// Ephemeral, human-readable handoff payload.
///
/// Emitted once to the operator surface and never stored by the system
/// itself (the audit log aside).
#[derive(Debug, Clone)]
pub struct JoinNotification {
    pub room: String,
    pub join_url: String,
    pub issued_at: DateTime<Utc>,
}

impl JoinNotification {
    pub fn new(room: impl Into<String>, join_url: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            join_url: join_url.into(),
            issued_at: Utc::now(),
        }
    }
}

/// Out-of-band channel that puts the join URL in front of a human operator.
pub trait OperatorNotifier: Send + Sync {
    fn notify(&self, notification: &JoinNotification) -> Result<(), HandoffError>;
}

/// Console notifier with an optional durable audit file.
///
/// Prints a fixed framed banner and appends one tab-separated line per
/// escalation to the audit file when one is configured.
pub struct ConsoleNotifier {
    audit_path: Option<PathBuf>,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self { audit_path: None }
    }

    /// Also append each notification to `path` for later audit.
    pub fn with_audit_file(path: impl Into<PathBuf>) -> Self {
        Self {
            audit_path: Some(path.into()),
        }
    }

    fn append_audit_line(&self, notification: &JoinNotification) -> Result<(), HandoffError> {
        let Some(path) = &self.audit_path else {
            return Ok(());
        };
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| HandoffError::Notification(format!("audit log open failed: {e}")))?;
        writeln!(
            file,
            "{}\t{}\t{}",
            notification.issued_at.format("%Y-%m-%d %H:%M:%S"),
            notification.room,
            notification.join_url
        )
        .map_err(|e| HandoffError::Notification(format!("audit log write failed: {e}")))
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorNotifier for ConsoleNotifier {
    fn notify(&self, notification: &JoinNotification) -> Result<(), HandoffError> {
        let frame = "=".repeat(80);
        let rule = "-".repeat(80);
        println!("\n{frame}");
        println!("HUMAN INTERVENTION REQUESTED");
        println!("{frame}");
        println!("Room: {}", notification.room);
        println!(
            "Timestamp: {}",
            notification.issued_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!("{rule}");
        println!("JOIN URL FOR HUMAN AGENT:");
        println!("{}", notification.join_url);
        println!("{rule}");
        println!("Share this URL with a human agent to join the call.");
        println!("{frame}\n");

        info!(
            room = %notification.room,
            join_url = %notification.join_url,
            "operator join notification emitted"
        );
        self.append_audit_line(notification)
    }
}
