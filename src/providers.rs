//! Collaborator contracts: camera roster, segment lists, access tokens.
//!
//! The core only sees these traits; actual HTTP plumbing lives outside.
//! File-backed implementations read the same JSON the REST endpoints
//! serve, which keeps the binary and the tests network-free.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use log::debug;

use crate::entities::{Camera, VideoSegment};

/// Why a fetch failed. Cancellation is not represented here: a
/// superseded request is silently dropped, never reported.
#[derive(Debug)]
pub enum FetchError {
    Io(std::io::Error),
    Decode(serde_json::Error),
    /// Backend reachable but refused or cannot serve the request.
    Unavailable(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Io(e) => write!(f, "I/O error: {}", e),
            FetchError::Decode(e) => write!(f, "Decode error: {}", e),
            FetchError::Unavailable(msg) => write!(f, "Unavailable: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e)
    }
}

/// Lists the camera roster.
pub trait RosterProvider: Send + Sync {
    fn fetch(&self) -> Result<Vec<Camera>, FetchError>;
}

/// Lists recorded segments for one calendar day (all cameras).
pub trait SegmentProvider: Send + Sync {
    fn fetch(&self, day: NaiveDate) -> Result<Vec<VideoSegment>, FetchError>;
}

/// Supplies an access token per source locator. Opaque to the core;
/// the transport backend appends it to the media URL.
pub trait TokenProvider {
    fn token_for(&self, locator: &str) -> Result<String, FetchError>;
}

/// Roster read from a JSON file.
pub struct FileRoster {
    path: PathBuf,
}

impl FileRoster {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RosterProvider for FileRoster {
    fn fetch(&self) -> Result<Vec<Camera>, FetchError> {
        let text = fs::read_to_string(&self.path)?;
        let cameras: Vec<Camera> = serde_json::from_str(&text)?;
        debug!("Loaded {} cameras from {}", cameras.len(), self.path.display());
        Ok(cameras)
    }
}

/// Segment list read from a JSON file, filtered per requested day.
pub struct FileSegments {
    path: PathBuf,
}

impl FileSegments {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SegmentProvider for FileSegments {
    fn fetch(&self, day: NaiveDate) -> Result<Vec<VideoSegment>, FetchError> {
        let text = fs::read_to_string(&self.path)?;
        let all: Vec<VideoSegment> = serde_json::from_str(&text)?;
        let total = all.len();
        let matching: Vec<VideoSegment> = all
            .into_iter()
            .filter(|seg| seg.start.date_naive() == day)
            .collect();
        debug!(
            "Loaded {}/{} segments for {} from {}",
            matching.len(),
            total,
            day,
            self.path.display()
        );
        Ok(matching)
    }
}

/// Fixed in-memory roster, for embedding and tests.
pub struct MemoryRoster(pub Vec<Camera>);

impl RosterProvider for MemoryRoster {
    fn fetch(&self) -> Result<Vec<Camera>, FetchError> {
        Ok(self.0.clone())
    }
}

/// Fixed in-memory segment list, filtered per requested day.
pub struct MemorySegments(pub Vec<VideoSegment>);

impl SegmentProvider for MemorySegments {
    fn fetch(&self, day: NaiveDate) -> Result<Vec<VideoSegment>, FetchError> {
        Ok(self
            .0
            .iter()
            .filter(|seg| seg.start.date_naive() == day)
            .cloned()
            .collect())
    }
}

/// Token provider handing the same opaque token to every locator.
pub struct StaticTokens {
    token: String,
}

impl StaticTokens {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Anonymous access (empty token).
    pub fn anonymous() -> Self {
        Self::new("")
    }
}

impl TokenProvider for StaticTokens {
    fn token_for(&self, _locator: &str) -> Result<String, FetchError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_memory_segments_filters_by_day() {
        let seg = |day: u32| VideoSegment {
            camera: 1,
            start: Utc.with_ymd_and_hms(2026, 8, day, 10, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 8, day, 10, 5, 0).unwrap(),
            file: format!("/static/cam1/{}.mp4", day),
        };
        let provider = MemorySegments(vec![seg(28), seg(29)]);
        let day = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let got = provider.fetch(day).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].start.date_naive(), day);
    }

    #[test]
    fn test_file_roster_missing_file_is_io_error() {
        let provider = FileRoster::new(PathBuf::from("/nonexistent/roster.json"));
        match provider.fetch() {
            Err(FetchError::Io(_)) => {}
            other => panic!("expected Io error, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_static_tokens() {
        let tokens = StaticTokens::new("secret");
        assert_eq!(tokens.token_for("/stream/1/out.m3u8").unwrap(), "secret");
        assert_eq!(StaticTokens::anonymous().token_for("x").unwrap(), "");
    }
}
