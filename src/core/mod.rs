//! Core engine modules - grid, timeline, sync, fetch, session
//!
//! These modules form the review engine, independent of any UI or
//! transport backend.

pub mod fetch;
pub mod grid;
pub mod resolver;
pub mod session;
pub mod sync;
pub mod timeline;
pub mod timeutil;

// Re-exports for convenience
pub use fetch::{FetchKind, FetchOutcome, FetchPayload, Fetcher};
pub use grid::{GridMap, StreamId, VALID_GRID_SIZES};
pub use resolver::{resolve, ResolvePolicy};
pub use session::ReviewSession;
pub use sync::{SyncInput, TransportPlan, DEFAULT_SLOP_SECS};
pub use timeline::{Phase, TimelineState, MAX_ZOOM, MIN_ZOOM};
