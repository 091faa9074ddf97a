//! Recorded video segments and the per-camera lookup index.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use super::camera::CameraId;

/// One bounded interval of recorded footage for a camera.
///
/// Field names follow the segment API's JSON (`start_date`, `end_date`,
/// `file`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSegment {
    pub camera: CameraId,
    #[serde(rename = "start_date")]
    pub start: DateTime<Utc>,
    #[serde(rename = "end_date")]
    pub end: DateTime<Utc>,
    /// Locator of the recorded media file.
    pub file: String,
}

impl VideoSegment {
    /// Whether `t` falls inside this segment (bounds inclusive).
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }

    /// Nominal length in seconds, from the recorded bounds. The actual
    /// media duration may differ slightly (encoder drift).
    pub fn nominal_secs(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }
}

/// Segments grouped per camera, sorted by start.
///
/// Overlapping or inverted entries are dropped at build time so lookups
/// can rely on disjoint, ordered intervals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentIndex {
    by_camera: BTreeMap<CameraId, Vec<VideoSegment>>,
    len: usize,
}

impl SegmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from a raw segment list.
    pub fn from_segments(segments: Vec<VideoSegment>) -> Self {
        let mut by_camera: BTreeMap<CameraId, Vec<VideoSegment>> = BTreeMap::new();
        for seg in segments {
            by_camera.entry(seg.camera).or_default().push(seg);
        }

        let mut len = 0;
        for (camera, list) in by_camera.iter_mut() {
            list.sort_by_key(|s| s.start);
            let mut kept: Vec<VideoSegment> = Vec::with_capacity(list.len());
            for seg in list.drain(..) {
                if seg.end < seg.start {
                    warn!("Dropping inverted segment for camera {}: {:?}", camera, seg.start);
                    continue;
                }
                if let Some(prev) = kept.last() {
                    if seg.start <= prev.end {
                        warn!(
                            "Dropping overlapping segment for camera {}: {} <= {}",
                            camera, seg.start, prev.end
                        );
                        continue;
                    }
                }
                kept.push(seg);
            }
            len += kept.len();
            *list = kept;
        }

        Self { by_camera, len }
    }

    /// Segment of `camera` containing the instant `t`, if any.
    pub fn segment_at(&self, camera: CameraId, t: DateTime<Utc>) -> Option<&VideoSegment> {
        self.by_camera
            .get(&camera)?
            .iter()
            .find(|seg| seg.contains(t))
    }

    /// All segments of one camera, ordered by start.
    pub fn for_camera(&self, camera: CameraId) -> &[VideoSegment] {
        self.by_camera
            .get(&camera)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 29, h, m, 0).unwrap()
    }

    fn seg(camera: CameraId, start: DateTime<Utc>, end: DateTime<Utc>) -> VideoSegment {
        VideoSegment {
            camera,
            start,
            end,
            file: format!("/static/{}-{}.mp4", camera, start.timestamp()),
        }
    }

    #[test]
    fn test_segment_at_inclusive_bounds() {
        let idx = SegmentIndex::from_segments(vec![seg(1, date(10, 0), date(10, 5))]);
        assert!(idx.segment_at(1, date(10, 0)).is_some());
        assert!(idx.segment_at(1, date(10, 5)).is_some());
        assert!(idx.segment_at(1, date(10, 6)).is_none());
        assert!(idx.segment_at(2, date(10, 2)).is_none());
    }

    #[test]
    fn test_overlapping_segments_dropped() {
        let idx = SegmentIndex::from_segments(vec![
            seg(1, date(10, 0), date(10, 10)),
            seg(1, date(10, 5), date(10, 15)),
            seg(1, date(10, 20), date(10, 30)),
        ]);
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.for_camera(1).len(), 2);
        // The survivor at 10:20 is intact
        assert!(idx.segment_at(1, date(10, 25)).is_some());
        // The overlapping one never made it in
        assert!(idx.segment_at(1, date(10, 12)).is_none());
    }

    #[test]
    fn test_unsorted_input_is_ordered() {
        let idx = SegmentIndex::from_segments(vec![
            seg(1, date(12, 0), date(12, 5)),
            seg(1, date(9, 0), date(9, 5)),
        ]);
        let list = idx.for_camera(1);
        assert_eq!(list.len(), 2);
        assert!(list[0].start < list[1].start);
    }

    #[test]
    fn test_nominal_secs() {
        let s = seg(1, date(10, 0), date(10, 5));
        assert_eq!(s.nominal_secs(), 300.0);
    }

    #[test]
    fn test_segment_json_shape() {
        let json = r#"{
            "camera": 2,
            "start_date": "2026-08-29T10:00:00Z",
            "end_date": "2026-08-29T10:05:00Z",
            "file": "/static/cam2/0001.mp4"
        }"#;
        let s: VideoSegment = serde_json::from_str(json).unwrap();
        assert_eq!(s.camera, 2);
        assert_eq!(s.nominal_secs(), 300.0);
    }
}
