//! Session registry and participant id allocation.
//!
//! Sessions are kept in ascending id order so every broadcast walks them in
//! the same sequence.

use std::collections::BTreeMap;

use arena_shared::net::ParticipantId;

use crate::{error::SimError, sink::SharedSink};

/// Hands out participant ids, starting at 1. Ids are never reused.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: Option<u32>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: Some(1) }
    }
}

impl IdAllocator {
    /// Starts allocation at an arbitrary id.
    pub fn starting_at(first: u32) -> Self {
        Self { next: Some(first) }
    }

    pub fn allocate(&mut self) -> Result<ParticipantId, SimError> {
        let id = self.next.ok_or(SimError::IdSpaceExhausted)?;
        self.next = id.checked_add(1);
        Ok(ParticipantId(id))
    }
}

/// Live sessions by participant id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<ParticipantId, SharedSink>,
}

impl SessionRegistry {
    /// Registers a session. Returns the previous sink if the id was taken.
    pub fn register(&mut self, id: ParticipantId, sink: SharedSink) -> Option<SharedSink> {
        self.sessions.insert(id, sink)
    }

    pub fn get(&self, id: ParticipantId) -> Option<&SharedSink> {
        self.sessions.get(&id)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn remove(&mut self, id: ParticipantId) -> Option<SharedSink> {
        self.sessions.remove(&id)
    }

    /// All sessions in ascending id order.
    pub fn all(&self) -> impl Iterator<Item = (ParticipantId, &SharedSink)> {
        self.sessions.iter().map(|(id, sink)| (*id, sink))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::testing::RecordingSink;

    #[test]
    fn ids_increase_from_one() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.allocate().unwrap(), ParticipantId(1));
        assert_eq!(ids.allocate().unwrap(), ParticipantId(2));
        assert_eq!(ids.allocate().unwrap(), ParticipantId(3));
    }

    #[test]
    fn exhaustion_is_reported_instead_of_wrapping() {
        let mut ids = IdAllocator::starting_at(u32::MAX - 1);
        assert_eq!(ids.allocate().unwrap(), ParticipantId(u32::MAX - 1));
        assert_eq!(ids.allocate().unwrap(), ParticipantId(u32::MAX));
        assert!(matches!(ids.allocate(), Err(SimError::IdSpaceExhausted)));
        assert!(matches!(ids.allocate(), Err(SimError::IdSpaceExhausted)));
    }

    #[test]
    fn iteration_is_in_id_order() {
        let mut reg = SessionRegistry::default();
        for id in [3, 1, 2] {
            reg.register(ParticipantId(id), RecordingSink::shared());
        }
        let order: Vec<_> = reg.all().map(|(id, _)| id.0).collect();
        assert_eq!(order, vec![1, 2, 3]);

        assert!(reg.remove(ParticipantId(2)).is_some());
        assert!(reg.get(ParticipantId(2)).is_none());
        assert!(reg.remove(ParticipantId(2)).is_none());
        assert_eq!(reg.len(), 2);
    }
}
