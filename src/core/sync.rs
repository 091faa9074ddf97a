//! Playback synchronizer: reconcile a transport with the timeline.
//!
//! Each tick produces a declarative [`TransportPlan`] from the resolved
//! source, the timeline instant and the transport's reported state.
//! Seeks are gated by a slop threshold so jitter never interrupts
//! normal playback; reapplying the same plan is a no-op up to that
//! tolerance.

use chrono::{DateTime, Utc};
use log::debug;

use crate::entities::ResolvedSource;
use crate::transport::{MediaTransport, TransportStatus};

/// Positional drift below this many seconds is left alone.
pub const DEFAULT_SLOP_SECS: f64 = 2.0;

/// Everything the synchronizer looks at for one slot on one tick.
#[derive(Debug, Clone)]
pub struct SyncInput<'a> {
    pub source: &'a ResolvedSource,
    /// Timeline instant being reviewed.
    pub current_date: DateTime<Utc>,
    /// Wall-clock now, for live-edge distance.
    pub now: DateTime<Utc>,
    /// Transport's reported state, `None` while loading.
    pub status: Option<TransportStatus>,
    pub speed: f64,
    pub is_playing: bool,
    pub is_scrubbing: bool,
    pub is_muted: bool,
}

/// Declarative per-tick instruction set for one transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportPlan {
    pub paused: bool,
    pub muted: bool,
    /// Effective playback rate (speed compensation x playback speed);
    /// `None` while the transport is not ready.
    pub rate: Option<f64>,
    /// Hard seek target in seconds, only when drift exceeds slop.
    pub seek: Option<f64>,
}

/// Compute the plan for one slot.
pub fn plan(input: &SyncInput, slop_secs: f64) -> TransportPlan {
    // Pause/mute are pushed every tick regardless of seek decisions.
    let mut out = TransportPlan {
        paused: input.is_scrubbing || !input.is_playing,
        muted: input.is_muted,
        rate: None,
        seek: None,
    };

    // Transport not ready yet: skip this tick gracefully.
    let Some(status) = input.status else {
        return out;
    };
    if status.duration <= 0.0 {
        return out;
    }

    let (mut desired, compensation) = match input.source {
        ResolvedSource::Recorded(seg) => {
            let nominal = seg.nominal_secs();
            if nominal <= 0.0 {
                return out;
            }
            // Scale corrects for encoder drift between the recorded
            // bounds and the actual media duration.
            let compensation = status.duration / nominal;
            let elapsed = (input.current_date - seg.start).num_milliseconds() as f64 / 1000.0;
            (elapsed * compensation, compensation)
        }
        ResolvedSource::Live(_) => {
            let behind = (input.now - input.current_date).num_milliseconds() as f64 / 1000.0;
            (status.duration - behind, 1.0)
        }
        ResolvedSource::None => return out,
    };

    // Within slop of the live edge, pin to the edge exactly so the
    // position does not oscillate around it.
    if (status.duration - desired).abs() < slop_secs {
        desired = status.duration;
    }

    out.rate = Some(compensation * input.speed);

    if (desired - status.position).abs() > slop_secs {
        debug!(
            "Adjusting {:.0} to {:.0} of {:.0}",
            status.position, desired, status.duration
        );
        out.seek = Some(desired);
    }

    out
}

/// Push a plan to a transport.
pub fn apply(plan: &TransportPlan, transport: &mut dyn MediaTransport) {
    if plan.paused {
        transport.pause();
    } else {
        transport.play();
    }
    transport.set_muted(plan.muted);
    if let Some(rate) = plan.rate {
        transport.set_rate(rate);
    }
    if let Some(target) = plan.seek {
        transport.seek(target);
    }
}
