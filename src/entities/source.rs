//! Media source chosen for one grid slot at one instant.

use super::camera::CameraId;
use super::segment::VideoSegment;

/// What a slot should show for the current timeline instant.
///
/// Recomputed fresh per slot per instant, never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSource {
    /// Live feed of the camera.
    Live(CameraId),
    /// A specific recorded segment.
    Recorded(VideoSegment),
    /// Nothing to show; render a placeholder with the camera name.
    None,
}

impl ResolvedSource {
    /// Locator handed to the media transport: the HLS manifest for live
    /// feeds, the file URL for recordings.
    pub fn locator(&self) -> Option<String> {
        match self {
            ResolvedSource::Live(id) => Some(format!("/stream/{}/out.m3u8", id)),
            ResolvedSource::Recorded(seg) => Some(seg.file.clone()),
            ResolvedSource::None => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, ResolvedSource::Live(_))
    }

    pub fn is_recorded(&self) -> bool {
        matches!(self, ResolvedSource::Recorded(_))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ResolvedSource::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_locators() {
        let live = ResolvedSource::Live(7);
        assert_eq!(live.locator().unwrap(), "/stream/7/out.m3u8");

        let seg = VideoSegment {
            camera: 7,
            start: Utc.with_ymd_and_hms(2026, 8, 29, 10, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 8, 29, 10, 5, 0).unwrap(),
            file: "/static/cam7/0001.mp4".into(),
        };
        let rec = ResolvedSource::Recorded(seg);
        assert_eq!(rec.locator().unwrap(), "/static/cam7/0001.mp4");

        assert_eq!(ResolvedSource::None.locator(), None);
    }
}
