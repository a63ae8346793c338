//! Interpolation.
//!
//! The server sends discrete snapshots at tick boundaries.
//! The client renders at its own rate and interpolates entity states.

use std::collections::VecDeque;

use arena_shared::{
    math::Vec2,
    net::{ParticipantId, Snapshot},
};

/// Buffered snapshot history for interpolation.
#[derive(Debug, Default)]
pub struct SnapshotBuffer {
    history: VecDeque<Snapshot>,
    max: usize,
}

impl SnapshotBuffer {
    pub fn new(max: usize) -> Self {
        Self {
            history: VecDeque::new(),
            max,
        }
    }

    pub fn push(&mut self, snap: Snapshot) {
        self.history.push_back(snap);
        while self.history.len() > self.max {
            self.history.pop_front();
        }
    }

    /// Returns the number of buffered snapshots.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Returns true if no snapshots are buffered.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Gets an interpolated position for an entity given a fractional alpha.
    ///
    /// `alpha` should be in $[0,1]$ where 0 = older snapshot, 1 = newer.
    pub fn interp_entity(&self, uid: ParticipantId, alpha: f32) -> Option<Vec2> {
        if self.history.len() < 2 {
            return None;
        }
        let a = &self.history[self.history.len() - 2];
        let b = &self.history[self.history.len() - 1];

        match (a.find(uid), b.find(uid)) {
            (Some(pa), Some(pb)) => Some(pa.position().lerp(pb.position(), alpha)),
            _ => None,
        }
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.history.back()
    }
}
