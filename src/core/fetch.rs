//! Background fetch pool with latest-request-wins cancellation.
//!
//! Roster and segment requests run on a small thread pool fed through a
//! work-stealing injector. Each resource class carries an epoch
//! counter: issuing a new request bumps it, which abandons any
//! in-flight request for the same class. The epoch is checked twice,
//! before the provider call (stale work is skipped) and before the
//! result is delivered (a late response is discarded, never applied).
//! A discarded request is not an error; it simply produces nothing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use crossbeam::deque::{Injector, Steal};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::trace;

use crate::entities::{Camera, VideoSegment};
use crate::providers::{FetchError, RosterProvider, SegmentProvider};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Resource class a fetch belongs to. Requests only cancel within
/// their own class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Roster,
    Segments,
}

/// Successful fetch payload.
#[derive(Debug)]
pub enum FetchPayload {
    Roster(Vec<Camera>),
    Segments(NaiveDate, Vec<VideoSegment>),
}

/// One completed (or failed) fetch, tagged with the epoch it was
/// issued under.
#[derive(Debug)]
pub struct FetchOutcome {
    pub kind: FetchKind,
    pub epoch: u64,
    pub result: Result<FetchPayload, FetchError>,
}

/// Fetch pool handle. Dropping it stops the worker threads.
pub struct Fetcher {
    injector: Arc<Injector<Job>>,
    shutdown: Arc<AtomicBool>,
    handles: Vec<thread::JoinHandle<()>>,
    roster_epoch: Arc<AtomicU64>,
    segment_epoch: Arc<AtomicU64>,
    tx: Sender<FetchOutcome>,
    rx: Receiver<FetchOutcome>,
    roster: Arc<dyn RosterProvider>,
    segments: Arc<dyn SegmentProvider>,
}

impl Fetcher {
    /// Spawn `num_threads` fetch workers (at least one).
    pub fn new(
        roster: Arc<dyn RosterProvider>,
        segments: Arc<dyn SegmentProvider>,
        num_threads: usize,
    ) -> Self {
        let injector: Arc<Injector<Job>> = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx, rx) = unbounded();

        let mut handles = Vec::new();
        for worker_id in 0..num_threads.max(1) {
            let injector = Arc::clone(&injector);
            let shutdown = Arc::clone(&shutdown);
            let handle = thread::Builder::new()
                .name(format!("vigil-fetch-{}", worker_id))
                .spawn(move || {
                    trace!("Fetch worker {} started", worker_id);
                    loop {
                        match injector.steal() {
                            Steal::Success(job) => {
                                job();
                                continue;
                            }
                            Steal::Retry => continue,
                            Steal::Empty => {}
                        }
                        if shutdown.load(Ordering::Relaxed) {
                            break;
                        }
                        // Idle: short sleep instead of spinning
                        thread::sleep(Duration::from_millis(1));
                    }
                    trace!("Fetch worker {} stopped", worker_id);
                })
                .expect("Failed to spawn fetch worker");
            handles.push(handle);
        }

        Self {
            injector,
            shutdown,
            handles,
            roster_epoch: Arc::new(AtomicU64::new(0)),
            segment_epoch: Arc::new(AtomicU64::new(0)),
            tx,
            rx,
            roster,
            segments,
        }
    }

    /// Request the camera roster, abandoning any in-flight roster fetch.
    pub fn request_roster(&self) {
        let epoch = self.roster_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.roster_epoch);
        let provider = Arc::clone(&self.roster);
        let tx = self.tx.clone();

        self.injector.push(Box::new(move || {
            if current.load(Ordering::SeqCst) != epoch {
                trace!("Roster fetch (epoch {}) superseded before start", epoch);
                return;
            }
            let result = provider.fetch().map(FetchPayload::Roster);
            if current.load(Ordering::SeqCst) != epoch {
                trace!("Roster fetch (epoch {}) superseded, result discarded", epoch);
                return;
            }
            let _ = tx.send(FetchOutcome {
                kind: FetchKind::Roster,
                epoch,
                result,
            });
        }));
    }

    /// Request the segment list for one day, abandoning any in-flight
    /// segment fetch.
    pub fn request_segments(&self, day: NaiveDate) {
        let epoch = self.segment_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.segment_epoch);
        let provider = Arc::clone(&self.segments);
        let tx = self.tx.clone();

        self.injector.push(Box::new(move || {
            if current.load(Ordering::SeqCst) != epoch {
                trace!("Segment fetch (epoch {}) superseded before start", epoch);
                return;
            }
            let result = provider
                .fetch(day)
                .map(|segs| FetchPayload::Segments(day, segs));
            if current.load(Ordering::SeqCst) != epoch {
                trace!("Segment fetch (epoch {}) superseded, result discarded", epoch);
                return;
            }
            let _ = tx.send(FetchOutcome {
                kind: FetchKind::Segments,
                epoch,
                result,
            });
        }));
    }

    /// Drain completed fetches. Outcomes from superseded epochs are
    /// dropped here as the last line of defense (the epoch may have
    /// been bumped after the result was already queued).
    pub fn poll(&self) -> Vec<FetchOutcome> {
        let mut fresh = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            let current = match outcome.kind {
                FetchKind::Roster => self.roster_epoch.load(Ordering::SeqCst),
                FetchKind::Segments => self.segment_epoch.load(Ordering::SeqCst),
            };
            if outcome.epoch == current {
                fresh.push(outcome);
            } else {
                trace!(
                    "Dropping stale {:?} outcome (epoch {} != {})",
                    outcome.kind, outcome.epoch, current
                );
            }
        }
        fresh
    }
}

impl Drop for Fetcher {
    fn drop(&mut self) {
        use std::time::Instant;

        self.shutdown.store(true, Ordering::SeqCst);

        // Wait with a timeout; in-flight provider calls may be slow and
        // the process will reap anything left.
        let deadline = Instant::now() + Duration::from_millis(500);
        let handles = std::mem::take(&mut self.handles);
        for handle in handles {
            while !handle.is_finished() {
                if Instant::now() >= deadline {
                    trace!("Fetcher shutdown timeout, detaching workers");
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crossbeam_channel::bounded;

    /// Roster provider that blocks on a gate before answering, so tests
    /// control exactly when the "network" responds.
    struct GatedRoster {
        gate: Receiver<()>,
        fail: bool,
    }

    impl RosterProvider for GatedRoster {
        fn fetch(&self) -> Result<Vec<Camera>, FetchError> {
            let _ = self.gate.recv();
            if self.fail {
                return Err(FetchError::Unavailable("backend down".into()));
            }
            Ok(vec![Camera {
                id: 1,
                name: "gate".into(),
                enabled: true,
                last_ping: None,
                video_end: None,
            }])
        }
    }

    struct EmptySegments;

    impl SegmentProvider for EmptySegments {
        fn fetch(&self, _day: NaiveDate) -> Result<Vec<VideoSegment>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn drain_with_timeout(fetcher: &Fetcher, want: usize) -> Vec<FetchOutcome> {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let mut got = Vec::new();
        while got.len() < want && std::time::Instant::now() < deadline {
            got.extend(fetcher.poll());
            thread::sleep(Duration::from_millis(5));
        }
        got
    }

    #[test]
    fn test_latest_roster_request_wins() {
        let (open, gate) = bounded(4);
        let roster = Arc::new(GatedRoster { gate, fail: false });
        let fetcher = Fetcher::new(roster, Arc::new(EmptySegments), 1);

        // Two requests before the provider is allowed to answer: the
        // first is superseded and must never surface.
        fetcher.request_roster();
        fetcher.request_roster();
        open.send(()).unwrap();
        open.send(()).unwrap();

        let outcomes = drain_with_timeout(&fetcher, 1);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].epoch, 2);
        assert!(outcomes[0].result.is_ok());

        // Nothing else trickles in afterwards
        thread::sleep(Duration::from_millis(50));
        assert!(fetcher.poll().is_empty());
    }

    #[test]
    fn test_failure_is_reported() {
        let (open, gate) = bounded(1);
        let roster = Arc::new(GatedRoster { gate, fail: true });
        let fetcher = Fetcher::new(roster, Arc::new(EmptySegments), 1);

        fetcher.request_roster();
        open.send(()).unwrap();

        let outcomes = drain_with_timeout(&fetcher, 1);
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(
            outcomes[0].result,
            Err(FetchError::Unavailable(_))
        ));
    }

    #[test]
    fn test_superseded_failure_is_silent() {
        let (open, gate) = bounded(2);
        let roster = Arc::new(GatedRoster { gate, fail: true });
        let fetcher = Fetcher::new(roster, Arc::new(EmptySegments), 1);

        fetcher.request_roster();
        // Supersede while (or before) the failing fetch runs
        fetcher.request_roster();
        open.send(()).unwrap();
        open.send(()).unwrap();

        let outcomes = drain_with_timeout(&fetcher, 1);
        // Only the latest epoch's failure arrives; the superseded one
        // vanished without becoming an error.
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].epoch, 2);
    }

    #[test]
    fn test_segment_fetch_round_trip() {
        struct OneSegment;
        impl SegmentProvider for OneSegment {
            fn fetch(&self, day: NaiveDate) -> Result<Vec<VideoSegment>, FetchError> {
                let start = day.and_hms_opt(10, 0, 0).unwrap().and_utc();
                Ok(vec![VideoSegment {
                    camera: 1,
                    start,
                    end: start + chrono::TimeDelta::minutes(5),
                    file: "/static/cam1/0001.mp4".into(),
                }])
            }
        }

        let (_open, gate) = bounded(1);
        let roster = Arc::new(GatedRoster { gate, fail: false });
        let fetcher = Fetcher::new(roster, Arc::new(OneSegment), 1);

        let day = Utc
            .with_ymd_and_hms(2026, 8, 29, 0, 0, 0)
            .unwrap()
            .date_naive();
        fetcher.request_segments(day);

        let outcomes = drain_with_timeout(&fetcher, 1);
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0].result {
            Ok(FetchPayload::Segments(got_day, segs)) => {
                assert_eq!(*got_day, day);
                assert_eq!(segs.len(), 1);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
