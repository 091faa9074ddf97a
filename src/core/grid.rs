//! Grid assignment engine: which stream occupies which display slot.
//!
//! A grid of N slots (N a perfect square) is addressed by index; slot i
//! sits at `(i % side, i / side)`. Every operation returns a complete
//! new snapshot, so callers swap the whole map and never observe a
//! partial state. Operations never fail: invalid input is a no-op.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::entities::{Camera, CameraId};

/// Stream id occupying a slot; live feeds carry their camera's id.
pub type StreamId = CameraId;

/// Grid sizes offered by the layout switcher.
pub const VALID_GRID_SIZES: [usize; 4] = [1, 4, 9, 16];

/// Immutable slot -> stream snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridMap {
    size: usize,
    slots: BTreeMap<usize, StreamId>,
}

fn idx_to_coord(idx: usize, side: usize) -> (usize, usize) {
    (idx % side, idx / side)
}

fn coord_to_idx(coord: (usize, usize), side: usize) -> Option<usize> {
    let (x, y) = coord;
    if x < side && y < side {
        Some(y * side + x)
    } else {
        None
    }
}

impl GridMap {
    /// Empty grid. Sizes outside [`VALID_GRID_SIZES`] fall back to 9.
    pub fn new(size: usize) -> Self {
        let size = if VALID_GRID_SIZES.contains(&size) { size } else { 9 };
        Self {
            size,
            slots: BTreeMap::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Side length of the square grid.
    pub fn side(&self) -> usize {
        (self.size as f64).sqrt() as usize
    }

    pub fn stream_at(&self, slot: usize) -> Option<StreamId> {
        self.slots.get(&slot).copied()
    }

    /// Slot occupied by `stream`, found by ascending scan.
    pub fn slot_of(&self, stream: StreamId) -> Option<usize> {
        (0..self.size).find(|i| self.slots.get(i) == Some(&stream))
    }

    /// Ids of all assigned streams, in slot order.
    pub fn stream_ids(&self) -> Vec<StreamId> {
        self.slots.values().copied().collect()
    }

    /// Occupied slots in ascending order.
    pub fn occupied_slots(&self) -> Vec<usize> {
        self.slots.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn first_open_slot(&self) -> Option<usize> {
        (0..self.size).find(|i| !self.slots.contains_key(i))
    }

    /// Place `stream` on the grid.
    ///
    /// A 1-slot grid always targets slot 0. Otherwise the hint is used
    /// when in range, or the first open slot when there is no hint. If
    /// the target is occupied and the incoming stream already held a
    /// slot, `replace == false` moves the occupant to that old slot (a
    /// swap) while `replace == true` evicts it. With no placeable slot
    /// the grid is returned unchanged.
    pub fn assign(&self, stream: StreamId, slot_hint: Option<usize>, replace: bool) -> GridMap {
        let target = if self.size == 1 {
            Some(0)
        } else {
            match slot_hint {
                Some(i) if i < self.size => Some(i),
                Some(_) => None,
                None => self.first_open_slot(),
            }
        };
        let Some(target) = target else {
            return self.clone();
        };

        let mut slots = self.slots.clone();
        if let Some(prev) = self.slot_of(stream) {
            match slots.get(&target).copied() {
                Some(occupant) if !replace => {
                    // Swap: the occupant takes the incoming stream's old slot.
                    slots.insert(prev, occupant);
                }
                _ => {
                    slots.remove(&prev);
                }
            }
        }
        slots.insert(target, stream);

        GridMap {
            size: self.size,
            slots,
        }
    }

    /// Fill open slots with every enabled camera not already assigned,
    /// in roster order, until the grid is full.
    pub fn assign_all<'a>(&self, cameras: impl IntoIterator<Item = &'a Camera>) -> GridMap {
        let mut next = self.clone();
        for camera in cameras {
            if !camera.enabled || next.slot_of(camera.id).is_some() {
                continue;
            }
            let Some(open) = next.first_open_slot() else {
                break;
            };
            next.slots.insert(open, camera.id);
        }
        next
    }

    /// Free the slot held by `stream`. Unknown stream is a no-op.
    pub fn remove(&self, stream: StreamId) -> GridMap {
        let mut next = self.clone();
        if let Some(slot) = self.slot_of(stream) {
            next.slots.remove(&slot);
        }
        next
    }

    /// Drop every assignment.
    pub fn clear(&self) -> GridMap {
        GridMap {
            size: self.size,
            slots: BTreeMap::new(),
        }
    }

    /// Change the slot count, preserving spatial locality.
    ///
    /// Each stream keeps its `(x, y)` coordinate when that cell exists
    /// and is free in the new grid. Displaced streams then fill open
    /// slots in ascending order; whatever still does not fit is dropped.
    pub fn resize(&self, new_size: usize) -> GridMap {
        if !VALID_GRID_SIZES.contains(&new_size) {
            return self.clone();
        }

        let old_side = self.side();
        let new_side = (new_size as f64).sqrt() as usize;

        let mut slots: BTreeMap<usize, StreamId> = BTreeMap::new();
        let mut displaced: Vec<StreamId> = Vec::new();

        for i in 0..self.size {
            let Some(&stream) = self.slots.get(&i) else {
                continue;
            };
            match coord_to_idx(idx_to_coord(i, old_side), new_side) {
                Some(idx) if idx < new_size && !slots.contains_key(&idx) => {
                    slots.insert(idx, stream);
                }
                _ => displaced.push(stream),
            }
        }

        let mut next = GridMap {
            size: new_size,
            slots,
        };
        let mut dropped = 0usize;
        for stream in displaced {
            match next.first_open_slot() {
                Some(open) => {
                    next.slots.insert(open, stream);
                }
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!(
                "Grid resize {} -> {} dropped {} stream(s)",
                self.size, new_size, dropped
            );
        }
        next
    }
}

impl Default for GridMap {
    fn default() -> Self {
        Self::new(9)
    }
}
