//! Source resolver: live feed, recorded segment, or nothing.
//!
//! Recorded footage wins over the live feed so scrubbing into the past
//! works even while the camera is online right now. The live branch is
//! bounded by the camera's stream start, by wall-clock now, and by the
//! DVR retention window.

use chrono::{DateTime, TimeDelta, Utc};

use crate::entities::{default_online_window, Camera, ResolvedSource, SegmentIndex};

/// Bounds applied to the live branch of resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvePolicy {
    /// How far back from now a live buffer is assumed reachable.
    /// `None` means unbounded.
    pub retention: Option<TimeDelta>,
    /// Ping recency required for a camera to count as online.
    pub online_window: TimeDelta,
}

impl Default for ResolvePolicy {
    fn default() -> Self {
        Self {
            retention: Some(TimeDelta::hours(24)),
            online_window: default_online_window(),
        }
    }
}

/// Pick the source for `camera` at instant `t`.
pub fn resolve(
    camera: &Camera,
    segments: &SegmentIndex,
    t: DateTime<Utc>,
    now: DateTime<Utc>,
    policy: &ResolvePolicy,
) -> ResolvedSource {
    if !camera.enabled {
        return ResolvedSource::None;
    }

    if let Some(seg) = segments.segment_at(camera.id, t) {
        return ResolvedSource::Recorded(seg.clone());
    }

    if t <= now
        && camera.online(now, policy.online_window)
        && camera.stream_start().is_some_and(|start| start <= t)
        && policy.retention.is_none_or(|window| now - t <= window)
    {
        return ResolvedSource::Live(camera.id);
    }

    ResolvedSource::None
}
