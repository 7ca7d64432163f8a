use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::{AppInfo, DeviceInfo, NotifierInfo};

/// Handled and unhandled counts of a session.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionEvents {
    /// Number of handled errors.
    pub handled: u64,
    /// Number of unhandled errors.
    pub unhandled: u64,
}

/// A read-only view of the active session, attached to events.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// The session identifier.
    pub id: Uuid,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// The error counts of the session so far.
    pub events: SessionEvents,
}

/// The counts of one flushed time window.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// The start of the window.
    pub started_at: DateTime<Utc>,
    /// Number of sessions started in the window.
    pub sessions_started: u64,
    /// Number of handled errors in the window.
    pub handled: u64,
    /// Number of unhandled errors in the window.
    pub unhandled: u64,
}

/// The body of a session delivery.
///
/// A payload is assembled once at flush time and never changed afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    /// The notifier that produced the payload.
    pub notifier: NotifierInfo,
    /// Application information.
    pub app: AppInfo,
    /// Host information.
    pub device: DeviceInfo,
    /// One entry per flushed window, oldest first.
    pub session_counts: Vec<SessionSummary>,
}

impl SessionPayload {
    /// The total handled count over all windows.
    pub fn handled(&self) -> u64 {
        self.session_counts.iter().map(|s| s.handled).sum()
    }

    /// The total unhandled count over all windows.
    pub fn unhandled(&self) -> u64 {
        self.session_counts.iter().map(|s| s.unhandled).sum()
    }

    /// The total number of started sessions over all windows.
    pub fn sessions_started(&self) -> u64 {
        self.session_counts.iter().map(|s| s.sessions_started).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = SessionSnapshot {
            id: Uuid::nil(),
            started_at: DateTime::from_timestamp(0, 0).unwrap(),
            events: SessionEvents {
                handled: 1,
                unhandled: 0,
            },
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["events"]["handled"], 1);
        assert_eq!(value["events"]["unhandled"], 0);
        assert_eq!(value["startedAt"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_payload_totals() {
        let window = |handled, unhandled| SessionSummary {
            started_at: Utc::now(),
            sessions_started: 1,
            handled,
            unhandled,
        };
        let payload = SessionPayload {
            notifier: NotifierInfo::default(),
            app: AppInfo::default(),
            device: DeviceInfo::default(),
            session_counts: vec![window(2, 1), window(3, 0)],
        };
        assert_eq!(payload.handled(), 5);
        assert_eq!(payload.unhandled(), 1);
        assert_eq!(payload.sessions_started(), 2);
    }
}
