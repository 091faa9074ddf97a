//! Camera roster entries.
//!
//! A camera is "online" while its last ping is recent enough; the live
//! feed is assumed reachable from that ping onward. Records deserialize
//! straight from the roster API's snake_case JSON.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Camera id as assigned by the backend. A live stream assigned to a
/// grid slot is identified by the same number.
pub type CameraId = u32;

/// Minutes without a ping after which a camera counts as offline.
pub const DEFAULT_ONLINE_WINDOW_MINS: i64 = 15;

/// One camera as reported by the roster endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub id: CameraId,
    pub name: String,
    pub enabled: bool,
    /// Last heartbeat from the camera process, if it ever pinged.
    #[serde(default)]
    pub last_ping: Option<DateTime<Utc>>,
    /// Latest instant covered by recorded footage, when known.
    #[serde(default)]
    pub video_end: Option<DateTime<Utc>>,
}

impl Camera {
    /// Whether the camera is currently reachable: pinged within the
    /// online window ending at `now`.
    pub fn online(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        match self.last_ping {
            Some(ping) => now - ping < window,
            None => false,
        }
    }

    /// Earliest instant the live feed is assumed available from.
    pub fn stream_start(&self) -> Option<DateTime<Utc>> {
        self.last_ping
    }
}

/// Default online window as a `TimeDelta`.
pub fn default_online_window() -> TimeDelta {
    TimeDelta::minutes(DEFAULT_ONLINE_WINDOW_MINS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cam(last_ping: Option<DateTime<Utc>>) -> Camera {
        Camera {
            id: 1,
            name: "gate".into(),
            enabled: true,
            last_ping,
            video_end: None,
        }
    }

    #[test]
    fn test_online_within_window() {
        let now = Utc::now();
        let c = cam(Some(now - TimeDelta::minutes(5)));
        assert!(c.online(now, default_online_window()));
    }

    #[test]
    fn test_offline_after_window() {
        let now = Utc::now();
        let c = cam(Some(now - TimeDelta::minutes(20)));
        assert!(!c.online(now, default_online_window()));
    }

    #[test]
    fn test_never_pinged_is_offline() {
        let now = Utc::now();
        assert!(!cam(None).online(now, default_online_window()));
    }

    #[test]
    fn test_roster_json_shape() {
        let json = r#"{
            "id": 3,
            "name": "driveway",
            "enabled": true,
            "last_ping": "2026-08-29T10:00:00Z"
        }"#;
        let c: Camera = serde_json::from_str(json).unwrap();
        assert_eq!(c.id, 3);
        assert!(c.last_ping.is_some());
        assert!(c.video_end.is_none());
    }
}
