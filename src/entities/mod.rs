//! Domain entities: cameras, recorded segments, resolved sources.

pub mod camera;
pub mod segment;
pub mod source;

pub use camera::{default_online_window, Camera, CameraId, DEFAULT_ONLINE_WINDOW_MINS};
pub use segment::{SegmentIndex, VideoSegment};
pub use source::ResolvedSource;
