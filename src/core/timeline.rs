//! Timeline interaction state machine.
//!
//! Owns the current review instant and the scrub/play/go-live
//! transitions around it. Commands are reducers: each takes the state
//! by reference and returns the next snapshot; nothing observes
//! internals while a command runs.
//!
//! Auto-advance runs on a fixed real-time tick. While the state is
//! pinned to the live edge the instant snaps to wall-clock now instead
//! of incrementing, so lag never accumulates.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::sync::DEFAULT_SLOP_SECS;

/// Zoom bounds offered by the timeline UI (power-of-two steps).
pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 32.0;

/// Which mode the timeline is in right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Pinned to the live edge.
    Live,
    /// Playing recorded footage at some past instant.
    PlayingRecorded,
    Paused,
    Scrubbing,
}

/// Review timeline state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineState {
    pub current_date: DateTime<Utc>,
    /// Power-of-two multiplier over the default one-day view.
    pub zoom: f64,
    /// Playback multiplier; below 1 is slow motion, negative rewinds.
    pub playback_speed: f64,
    pub is_playing: bool,
    pub is_scrubbing: bool,
    pub is_muted: bool,
    /// Distance from now, in seconds, still considered "live".
    pub slop_secs: f64,
}

impl Default for TimelineState {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl TimelineState {
    /// Fresh state pinned to the live edge at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current_date: now,
            zoom: 1.0,
            playback_speed: 1.0,
            is_playing: true,
            is_scrubbing: false,
            is_muted: false,
            slop_secs: DEFAULT_SLOP_SECS,
        }
    }

    fn slop(&self) -> TimeDelta {
        TimeDelta::milliseconds((self.slop_secs * 1000.0) as i64)
    }

    /// Whether the instant sits at the live edge: within slop of now
    /// and not in slow motion or rewind.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now - self.current_date <= self.slop() && self.playback_speed >= 1.0
    }

    pub fn phase(&self, now: DateTime<Utc>) -> Phase {
        if self.is_scrubbing {
            Phase::Scrubbing
        } else if !self.is_playing {
            Phase::Paused
        } else if self.is_live(now) {
            Phase::Live
        } else {
            Phase::PlayingRecorded
        }
    }

    /// Advance one timer tick of `tick_ms` real milliseconds.
    ///
    /// No-op while paused or scrubbing. At the live edge the instant
    /// snaps to `now`; otherwise it moves by `tick_ms * speed`, clamped
    /// so it never passes now.
    pub fn tick(&self, now: DateTime<Utc>, tick_ms: u64) -> Self {
        if !self.is_playing || self.is_scrubbing {
            return self.clone();
        }
        let mut next = self.clone();
        if self.is_live(now) {
            next.current_date = now;
        } else {
            let step = TimeDelta::milliseconds((tick_ms as f64 * self.playback_speed) as i64);
            next.current_date = (self.current_date + step).min(now);
        }
        next
    }

    /// Drag start.
    pub fn begin_scrub(&self) -> Self {
        let mut next = self.clone();
        next.is_scrubbing = true;
        next
    }

    /// Drag update; the instant never passes now.
    pub fn scrub_to(&self, date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.current_date = date.min(now);
        next
    }

    /// Drag release. Within slop of now the state resumes at the live
    /// edge; further back it keeps playing the recorded past.
    pub fn end_scrub(&self, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.is_scrubbing = false;
        if now - next.current_date <= next.slop() {
            next.current_date = now;
        }
        next
    }

    /// Explicit "go live": jump to now at 1x, playing.
    pub fn go_live(&self, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.current_date = now;
        next.playback_speed = 1.0;
        next.is_playing = true;
        next.is_scrubbing = false;
        next
    }

    /// Jump to an arbitrary instant (calendar pick), clamped to now.
    pub fn set_date(&self, date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.current_date = date.min(now);
        next
    }

    pub fn set_zoom(&self, zoom: f64) -> Self {
        let mut next = self.clone();
        next.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        next
    }

    pub fn zoom_in(&self) -> Self {
        self.set_zoom(self.zoom * 2.0)
    }

    pub fn zoom_out(&self) -> Self {
        self.set_zoom(self.zoom * 0.5)
    }

    pub fn set_speed(&self, speed: f64) -> Self {
        let mut next = self.clone();
        next.playback_speed = speed;
        next
    }

    pub fn set_playing(&self, playing: bool) -> Self {
        let mut next = self.clone();
        next.is_playing = playing;
        next
    }

    pub fn set_muted(&self, muted: bool) -> Self {
        let mut next = self.clone();
        next.is_muted = muted;
        next
    }
}
