//! Review session: the single-threaded heart of the console.
//!
//! Owns the timeline state, the grid snapshot, the last-known-good
//! roster/segment data and one transport per occupied slot. Everything
//! converges in `tick`: fetch completions are drained into state, the
//! timeline advances, and every slot's transport is reconciled against
//! the source resolved for the current instant.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};

use crate::config::Settings;
use crate::core::fetch::{FetchKind, FetchPayload, Fetcher};
use crate::core::grid::{GridMap, StreamId};
use crate::core::resolver::{resolve, ResolvePolicy};
use crate::core::sync::{self, SyncInput};
use crate::core::timeline::{Phase, TimelineState};
use crate::entities::{Camera, CameraId, ResolvedSource, SegmentIndex, VideoSegment};
use crate::providers::{RosterProvider, SegmentProvider, TokenProvider};
use crate::transport::{MediaTransport, TransportFactory};

/// Transport bound to one grid slot, keyed by the locator it plays.
struct SlotPlayback {
    locator: String,
    transport: Box<dyn MediaTransport>,
}

/// One review console instance.
pub struct ReviewSession {
    settings: Settings,
    state: TimelineState,
    grid: GridMap,
    cameras: Vec<Camera>,
    segments: SegmentIndex,
    fetcher: Fetcher,
    tokens: Box<dyn TokenProvider>,
    transports: Box<dyn TransportFactory>,
    slots: BTreeMap<usize, SlotPlayback>,
    loaded_day: Option<NaiveDate>,
    roster_error: bool,
    segment_error: bool,
}

impl ReviewSession {
    pub fn new(
        settings: Settings,
        roster: Arc<dyn RosterProvider>,
        segments: Arc<dyn SegmentProvider>,
        tokens: Box<dyn TokenProvider>,
        transports: Box<dyn TransportFactory>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut state = TimelineState::new(now);
        state.slop_secs = settings.slop_secs;
        let fetcher = Fetcher::new(roster, segments, settings.fetch_thread_count());
        let grid = GridMap::new(settings.default_grid_size);

        Self {
            settings,
            state,
            grid,
            cameras: Vec::new(),
            segments: SegmentIndex::new(),
            fetcher,
            tokens,
            transports,
            slots: BTreeMap::new(),
            loaded_day: None,
            roster_error: false,
            segment_error: false,
        }
    }

    // ========== State exposure ==========

    pub fn timeline(&self) -> &TimelineState {
        &self.state
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn camera(&self, id: CameraId) -> Option<&Camera> {
        self.cameras.iter().find(|c| c.id == id)
    }

    pub fn phase(&self, now: DateTime<Utc>) -> Phase {
        self.state.phase(now)
    }

    /// Roster fetch failed and the shown roster is stale.
    pub fn roster_error(&self) -> bool {
        self.roster_error
    }

    /// Segment fetch failed and the shown timeline is stale.
    pub fn segment_error(&self) -> bool {
        self.segment_error
    }

    // ========== Grid commands ==========

    pub fn assign(&mut self, stream: StreamId, slot_hint: Option<usize>, replace: bool) {
        self.grid = self.grid.assign(stream, slot_hint, replace);
    }

    /// Put every enabled camera on the grid, in roster order.
    pub fn assign_all(&mut self) {
        self.grid = self.grid.assign_all(self.cameras.iter());
    }

    pub fn remove(&mut self, stream: StreamId) {
        self.grid = self.grid.remove(stream);
    }

    pub fn clear_grid(&mut self) {
        self.grid = self.grid.clear();
    }

    pub fn resize(&mut self, new_size: usize) {
        self.grid = self.grid.resize(new_size);
    }

    // ========== Timeline commands ==========

    pub fn go_live(&mut self, now: DateTime<Utc>) {
        self.state = self.state.go_live(now);
    }

    pub fn begin_scrub(&mut self) {
        self.state = self.state.begin_scrub();
    }

    pub fn scrub_to(&mut self, date: DateTime<Utc>, now: DateTime<Utc>) {
        self.state = self.state.scrub_to(date, now);
    }

    pub fn end_scrub(&mut self, now: DateTime<Utc>) {
        self.state = self.state.end_scrub(now);
    }

    pub fn set_date(&mut self, date: DateTime<Utc>, now: DateTime<Utc>) {
        self.state = self.state.set_date(date, now);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.state = self.state.set_zoom(zoom);
    }

    pub fn zoom_in(&mut self) {
        self.state = self.state.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.state = self.state.zoom_out();
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.state = self.state.set_speed(speed);
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.state = self.state.set_playing(playing);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.state = self.state.set_muted(muted);
    }

    // ========== Data injection ==========

    /// Ask the backend for a fresh roster (cancels any in-flight one).
    pub fn refresh_roster(&self) {
        self.fetcher.request_roster();
    }

    /// Apply a roster directly, bypassing the fetch path.
    pub fn set_cameras(&mut self, cameras: Vec<Camera>) {
        self.cameras = cameras;
        self.roster_error = false;
    }

    /// Apply a segment list directly, bypassing the fetch path.
    pub fn set_segments(&mut self, segments: Vec<VideoSegment>) {
        self.segments = SegmentIndex::from_segments(segments);
        self.segment_error = false;
    }

    // ========== Resolution ==========

    fn policy(&self) -> ResolvePolicy {
        ResolvePolicy {
            retention: self.settings.retention(),
            online_window: self.settings.online_window(),
        }
    }

    /// Source the given slot should show at instant `now`.
    pub fn resolved_source(&self, slot: usize, now: DateTime<Utc>) -> ResolvedSource {
        let Some(stream) = self.grid.stream_at(slot) else {
            return ResolvedSource::None;
        };
        let Some(camera) = self.camera(stream) else {
            return ResolvedSource::None;
        };
        resolve(
            camera,
            &self.segments,
            self.state.current_date,
            now,
            &self.policy(),
        )
    }

    // ========== The tick ==========

    /// One real-time tick: apply fetch results, advance the timeline,
    /// reconcile every slot's transport. Safe to call repeatedly; all
    /// transport effects are gated by the synchronizer's slop policy.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.drain_fetches();

        self.state = self.state.tick(now, self.settings.tick_ms);

        // Crossing a day boundary (or the very first tick) reloads the
        // segment list; the request supersedes any in-flight one.
        let day = self.state.current_date.date_naive();
        if self.loaded_day != Some(day) {
            debug!("Requesting segments for {}", day);
            self.loaded_day = Some(day);
            self.fetcher.request_segments(day);
        }

        // Transports of freed slots go away with their entries.
        let grid = self.grid.clone();
        self.slots.retain(|slot, _| grid.stream_at(*slot).is_some());

        for slot in grid.occupied_slots() {
            self.reconcile_slot(slot, now);
        }
    }

    fn drain_fetches(&mut self) {
        for outcome in self.fetcher.poll() {
            match outcome.result {
                Ok(FetchPayload::Roster(cameras)) => {
                    info!("Roster updated: {} cameras", cameras.len());
                    self.cameras = cameras;
                    self.roster_error = false;
                }
                Ok(FetchPayload::Segments(day, segments)) => {
                    info!("Segments updated for {}: {} entries", day, segments.len());
                    self.segments = SegmentIndex::from_segments(segments);
                    self.segment_error = false;
                }
                Err(e) => match outcome.kind {
                    // Keep last-known-good data, just flag the failure.
                    FetchKind::Roster => {
                        warn!("Roster fetch failed: {}", e);
                        self.roster_error = true;
                    }
                    FetchKind::Segments => {
                        warn!("Segment fetch failed: {}", e);
                        self.segment_error = true;
                    }
                },
            }
        }
    }

    fn reconcile_slot(&mut self, slot: usize, now: DateTime<Utc>) {
        let source = self.resolved_source(slot, now);
        let Some(locator) = source.locator() else {
            self.slots.remove(&slot);
            return;
        };

        let needs_open = self
            .slots
            .get(&slot)
            .is_none_or(|playback| playback.locator != locator);
        if needs_open {
            let token = match self.tokens.token_for(&locator) {
                Ok(token) => token,
                Err(e) => {
                    warn!("Token request failed for {}: {}", locator, e);
                    self.slots.remove(&slot);
                    return;
                }
            };
            debug!("Slot {}: opening {}", slot, locator);
            let transport = self.transports.open(&locator, &token);
            self.slots.insert(
                slot,
                SlotPlayback {
                    locator,
                    transport,
                },
            );
        }

        let state = self.state.clone();
        let slop = self.settings.slop_secs;
        let Some(playback) = self.slots.get_mut(&slot) else {
            return;
        };
        let input = SyncInput {
            source: &source,
            current_date: state.current_date,
            now,
            status: playback.transport.inspect(),
            speed: state.playback_speed,
            is_playing: state.is_playing,
            is_scrubbing: state.is_scrubbing,
            is_muted: state.is_muted,
        };
        let plan = sync::plan(&input, slop);
        sync::apply(&plan, playback.transport.as_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{FetchError, MemoryRoster, MemorySegments, StaticTokens};
    use crate::transport::TransportStatus;
    use chrono::{TimeDelta, TimeZone};
    use std::sync::Mutex;

    fn date(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 29, h, m, s).unwrap()
    }

    fn cam(id: CameraId, last_ping: Option<DateTime<Utc>>) -> Camera {
        Camera {
            id,
            name: format!("cam{}", id),
            enabled: true,
            last_ping,
            video_end: None,
        }
    }

    /// Transport that records every command and serves a scripted
    /// status.
    struct RecordingTransport {
        locator: String,
        log: Arc<Mutex<Vec<String>>>,
        status: Arc<Mutex<Option<TransportStatus>>>,
    }

    impl MediaTransport for RecordingTransport {
        fn play(&mut self) {
            self.log.lock().unwrap().push(format!("play {}", self.locator));
        }
        fn pause(&mut self) {
            self.log.lock().unwrap().push(format!("pause {}", self.locator));
        }
        fn seek(&mut self, secs: f64) {
            self.log.lock().unwrap().push(format!("seek {} {}", self.locator, secs));
        }
        fn set_rate(&mut self, rate: f64) {
            self.log.lock().unwrap().push(format!("rate {} {}", self.locator, rate));
        }
        fn set_muted(&mut self, _muted: bool) {}
        fn inspect(&self) -> Option<TransportStatus> {
            *self.status.lock().unwrap()
        }
    }

    struct RecordingFactory {
        log: Arc<Mutex<Vec<String>>>,
        status: Arc<Mutex<Option<TransportStatus>>>,
    }

    impl TransportFactory for RecordingFactory {
        fn open(&self, locator: &str, _token: &str) -> Box<dyn MediaTransport> {
            self.log.lock().unwrap().push(format!("open {}", locator));
            Box::new(RecordingTransport {
                locator: locator.to_string(),
                log: Arc::clone(&self.log),
                status: Arc::clone(&self.status),
            })
        }
    }

    struct FailingRoster;

    impl RosterProvider for FailingRoster {
        fn fetch(&self) -> Result<Vec<Camera>, FetchError> {
            Err(FetchError::Unavailable("backend down".into()))
        }
    }

    fn session_with(
        cameras: Vec<Camera>,
        segments: Vec<VideoSegment>,
        now: DateTime<Utc>,
    ) -> (ReviewSession, Arc<Mutex<Vec<String>>>, Arc<Mutex<Option<TransportStatus>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let status = Arc::new(Mutex::new(None));
        let factory = RecordingFactory {
            log: Arc::clone(&log),
            status: Arc::clone(&status),
        };
        let mut session = ReviewSession::new(
            Settings::default(),
            Arc::new(MemoryRoster(cameras.clone())),
            Arc::new(MemorySegments(segments.clone())),
            Box::new(StaticTokens::anonymous()),
            Box::new(factory),
            now,
        );
        session.set_cameras(cameras);
        session.set_segments(segments);
        (session, log, status)
    }

    fn seg(camera: CameraId, start: DateTime<Utc>, end: DateTime<Utc>) -> VideoSegment {
        VideoSegment {
            camera,
            start,
            end,
            file: format!("/static/cam{}/0001.mp4", camera),
        }
    }

    #[test]
    fn test_tick_opens_live_transport() {
        let now = date(12, 0, 0);
        let (mut session, log, _status) =
            session_with(vec![cam(1, Some(now - TimeDelta::minutes(1)))], vec![], now);

        session.assign_all();
        assert_eq!(session.grid().stream_at(0), Some(1));

        session.tick(now);
        let log = log.lock().unwrap();
        assert!(log.iter().any(|l| l == "open /stream/1/out.m3u8"), "log: {:?}", log);
        // Transport not ready (no status), so no seek was attempted
        assert!(!log.iter().any(|l| l.starts_with("seek")));
    }

    #[test]
    fn test_scrub_into_recording_switches_locator() {
        let now = date(12, 0, 0);
        let segments = vec![seg(1, date(10, 0, 0), date(10, 5, 0))];
        let (mut session, log, _status) = session_with(
            vec![cam(1, Some(now - TimeDelta::minutes(1)))],
            segments,
            now,
        );

        session.assign_all();
        session.tick(now);

        session.begin_scrub();
        session.scrub_to(date(10, 2, 0), now);
        session.end_scrub(now);
        session.tick(now);

        let log = log.lock().unwrap();
        assert!(log.iter().any(|l| l == "open /stream/1/out.m3u8"));
        assert!(log.iter().any(|l| l == "open /static/cam1/0001.mp4"), "log: {:?}", log);
    }

    #[test]
    fn test_drift_seek_applied_to_transport() {
        let now = date(12, 0, 0);
        let segments = vec![seg(1, date(10, 0, 0), date(10, 5, 0))];
        let (mut session, log, status) = session_with(
            vec![cam(1, Some(now - TimeDelta::minutes(1)))],
            segments,
            now,
        );

        session.assign_all();
        session.set_date(date(10, 2, 0), now);
        session.set_playing(false);
        session.tick(now);

        // Media reports a 300s duration but sits at the start: the
        // synchronizer must seek 120s in.
        *status.lock().unwrap() = Some(TransportStatus {
            position: 0.0,
            duration: 300.0,
        });
        session.tick(now);

        let log = log.lock().unwrap();
        assert!(
            log.iter().any(|l| l == "seek /static/cam1/0001.mp4 120"),
            "log: {:?}",
            log
        );
    }

    #[test]
    fn test_empty_slot_resolves_none() {
        let now = date(12, 0, 0);
        let (session, _log, _status) = session_with(vec![cam(1, None)], vec![], now);
        assert!(session.resolved_source(3, now).is_none());
    }

    #[test]
    fn test_removing_stream_drops_transport() {
        let now = date(12, 0, 0);
        let (mut session, log, _status) =
            session_with(vec![cam(1, Some(now - TimeDelta::minutes(1)))], vec![], now);

        session.assign_all();
        session.tick(now);
        assert!(log.lock().unwrap().iter().any(|l| l.starts_with("open")));

        session.remove(1);
        session.tick(now);
        assert!(session.resolved_source(0, now).is_none());

        // No reopen after removal
        let opens = log
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.starts_with("open"))
            .count();
        assert_eq!(opens, 1);
    }

    #[test]
    fn test_failed_roster_fetch_sets_flag_keeps_data() {
        let now = date(12, 0, 0);
        let log = Arc::new(Mutex::new(Vec::new()));
        let status = Arc::new(Mutex::new(None));
        let mut session = ReviewSession::new(
            Settings::default(),
            Arc::new(FailingRoster),
            Arc::new(MemorySegments(vec![])),
            Box::new(StaticTokens::anonymous()),
            Box::new(RecordingFactory { log, status }),
            now,
        );
        session.set_cameras(vec![cam(1, None)]);

        session.refresh_roster();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !session.roster_error() && std::time::Instant::now() < deadline {
            session.tick(now);
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        assert!(session.roster_error());
        // Last-known-good roster is still there
        assert_eq!(session.cameras().len(), 1);
    }

    #[test]
    fn test_paused_phase_reaches_transport() {
        let now = date(12, 0, 0);
        let (mut session, log, status) =
            session_with(vec![cam(1, Some(now - TimeDelta::minutes(1)))], vec![], now);

        session.assign_all();
        *status.lock().unwrap() = Some(TransportStatus {
            position: 0.0,
            duration: 60.0,
        });
        session.set_playing(false);
        session.tick(now);

        assert_eq!(session.phase(now), Phase::Paused);
        assert!(log
            .lock()
            .unwrap()
            .iter()
            .any(|l| l.starts_with("pause /stream/1")));
    }
}
