//! VIGIL - Multi-camera video review library
//!
//! Re-exports all modules for use by binary targets.

// Core engine (grid, timeline, sync, fetch, session)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod entities;
pub mod providers;
pub mod transport;

// Re-export commonly used types from core
pub use core::grid::GridMap;
pub use core::session::ReviewSession;
pub use core::timeline::{Phase, TimelineState};

// Re-export entities
pub use entities::{Camera, CameraId, ResolvedSource, SegmentIndex, VideoSegment};
