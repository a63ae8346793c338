//! Entity store.
//!
//! One simulated entity per joined participant. Entities are only created by a
//! successful join; every mutation targets an existing entity.

use std::collections::BTreeMap;

use arena_shared::{
    math::Vec2,
    net::{EntityState, ParticipantId},
};

use crate::{error::SimError, sink::SharedSink};

/// Simulated state for one participant.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: ParticipantId,
    pub position: Vec2,
    pub sink: SharedSink,
}

impl Entity {
    pub fn state(&self) -> EntityState {
        EntityState {
            uid: self.id,
            x: self.position.x,
            y: self.position.y,
        }
    }
}

#[derive(Debug, Default)]
pub struct EntityStore {
    entities: BTreeMap<ParticipantId, Entity>,
}

impl EntityStore {
    /// Creates (or replaces) the entity for `id`.
    pub fn create(&mut self, id: ParticipantId, x: f32, y: f32, sink: SharedSink) -> &Entity {
        self.entities.insert(
            id,
            Entity {
                id,
                position: Vec2::new(x, y),
                sink,
            },
        );
        &self.entities[&id]
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Applies `f` to an existing entity.
    pub fn update<F>(&mut self, id: ParticipantId, f: F) -> Result<(), SimError>
    where
        F: FnOnce(&mut Entity),
    {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(SimError::UnknownParticipant(id))?;
        f(entity);
        Ok(())
    }

    pub fn remove(&mut self, id: ParticipantId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// All entities in ascending id order.
    pub fn all(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::testing::RecordingSink;

    #[test]
    fn update_requires_prior_create() {
        let mut store = EntityStore::default();
        let err = store
            .update(ParticipantId(9), |e| e.position.x += 1.0)
            .unwrap_err();
        assert!(matches!(err, SimError::UnknownParticipant(ParticipantId(9))));
        assert!(store.is_empty());
    }

    #[test]
    fn update_mutates_position() {
        let mut store = EntityStore::default();
        store.create(ParticipantId(1), 0.0, 0.0, RecordingSink::shared());
        store
            .update(ParticipantId(1), |e| e.position += Vec2::new(2.0, -1.0))
            .unwrap();
        let state = store.get(ParticipantId(1)).unwrap().state();
        assert_eq!((state.x, state.y), (2.0, -1.0));
    }
}
