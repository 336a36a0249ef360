// Entity registry: the single owner of live networked entities.

use crate::domain::{EntityId, NetworkedEntity, ParticipantId, RegistryError};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub struct EntityRegistry {
    live: HashMap<EntityId, NetworkedEntity>,
    /// Ids that were registered at some point this session; never reused.
    used: HashSet<EntityId>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: NetworkedEntity) -> Result<EntityId, RegistryError> {
        let id = entity.id;
        if !self.used.insert(id) {
            return Err(RegistryError::DuplicateId(id));
        }
        self.live.insert(id, entity);
        Ok(id)
    }

    pub fn find(&self, id: EntityId) -> Result<&NetworkedEntity, RegistryError> {
        self.live.get(&id).ok_or(RegistryError::NotFound(id))
    }

    pub fn find_mut(&mut self, id: EntityId) -> Result<&mut NetworkedEntity, RegistryError> {
        self.live.get_mut(&id).ok_or(RegistryError::NotFound(id))
    }

    pub fn unregister(&mut self, id: EntityId) -> Result<NetworkedEntity, RegistryError> {
        self.live.remove(&id).ok_or(RegistryError::NotFound(id))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn was_used(&self, id: EntityId) -> bool {
        self.used.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkedEntity> {
        self.live.values()
    }

    pub fn owned_by(&self, participant: ParticipantId) -> impl Iterator<Item = &NetworkedEntity> {
        self.live.values().filter(move |e| e.owner == participant)
    }
}
