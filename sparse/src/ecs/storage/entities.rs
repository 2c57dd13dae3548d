use crate::ecs::{
    entity::Entity,
    storage::{
        error::{self, Error},
        sparse_set::{DeletionPolicy, SparseSet},
    },
};

/// The identifier pool: a swap-only [`SparseSet`] whose entities are their own payload.
///
/// Every index ever handed out keeps a slot. The first [`EntityStorage::in_use`] slots hold live
/// identifiers; the slots past that boundary hold retired identifiers at their next version,
/// waiting to be handed out again.
///
/// ```text
///   packed:  [ 0v0 | 2v0 | 3v1 | 1v1 ]
///                          ▲
///                        in_use = 2
/// ```
///
/// Spawning with a hint for an index never seen before fills every lower unseen index with a
/// retired placeholder at version 0, so the packed array always holds exactly the indices
/// `0..len()`.
#[derive(Debug)]
pub struct EntityStorage {
    base: SparseSet,
}

impl EntityStorage {
    pub fn new() -> Self {
        Self {
            base: SparseSet::new(DeletionPolicy::SwapOnly),
        }
    }

    /// The underlying swap-only sparse set.
    #[inline]
    pub fn base(&self) -> &SparseSet {
        &self.base
    }

    /// Number of indices ever handed out, retired ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.base.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Number of live identifiers.
    #[inline]
    pub fn in_use(&self) -> usize {
        self.base.free_list()
    }

    /// Move the live boundary. Identifiers past `len` become retired without a version bump.
    #[inline]
    pub fn set_in_use(&mut self, len: usize) {
        self.base.set_free_list(len);
    }

    /// Returns `true` if `entity` is live at exactly its version.
    #[inline]
    pub fn valid(&self, entity: Entity) -> bool {
        self.base
            .find(entity)
            .is_some_and(|pos| pos < self.in_use())
    }

    /// The version on record for the index of `entity`, or the tombstone version if the index was
    /// never handed out.
    #[inline]
    pub fn current(&self, entity: Entity) -> u32 {
        self.base.current(entity)
    }

    /// Reserve room for `capacity` identifiers in total.
    pub fn reserve(&mut self, capacity: usize) {
        self.base.reserve(capacity);
    }

    /// Hand out an identifier: the first retired one if any, a brand new index otherwise.
    ///
    /// Fails with [`Error::Exhausted`] once every index is live.
    pub fn try_spawn(&mut self) -> Result<Entity, Error> {
        let in_use = self.in_use();
        if in_use < self.base.len() {
            let entity = self.base.at(in_use);
            self.base.try_push(entity)?;
            return Ok(entity);
        }

        let index = self.base.len();
        if index >= Entity::ENTITY_MASK as usize {
            return Err(Error::Exhausted);
        }
        let entity = Entity::construct(index as u32, 0);
        self.base.try_push(entity)?;
        Ok(entity)
    }

    /// Infallible [`EntityStorage::try_spawn`].
    pub fn spawn(&mut self) -> Entity {
        error::infallible(self.try_spawn())
    }

    /// Hand out `hint` itself if its index is not live, falling back to [`EntityStorage::spawn`]
    /// otherwise. Null and tombstone hints always fall back.
    pub fn try_spawn_hint(&mut self, hint: Entity) -> Result<Entity, Error> {
        if hint.is_null() || hint.is_tombstone() {
            return self.try_spawn();
        }

        while hint.slot() >= self.base.len() {
            let placeholder = Entity::construct(self.base.len() as u32, 0);
            self.base.try_push(placeholder)?;
            self.base.set_free_list(self.base.free_list() - 1);
        }

        let stored = Entity::construct(hint.index(), self.base.current(hint));
        let pos = self.base.index(stored);
        let in_use = self.in_use();
        if pos < in_use {
            return self.try_spawn();
        }

        self.base.swap_at(pos, in_use);
        self.base.set_free_list(in_use + 1);
        self.base.bump(hint);
        Ok(hint)
    }

    /// Infallible [`EntityStorage::try_spawn_hint`].
    pub fn spawn_hint(&mut self, hint: Entity) -> Entity {
        error::infallible(self.try_spawn_hint(hint))
    }

    /// Hand out `count` identifiers.
    pub fn spawn_many(&mut self, count: usize) -> Vec<Entity> {
        self.base.reserve(self.in_use() + count);
        (0..count).map(|_| self.spawn()).collect()
    }

    /// Retire a live identifier, bumping its version.
    ///
    /// # Panics
    ///
    /// Debug builds panic if `entity` is not live.
    pub fn erase(&mut self, entity: Entity) {
        debug_assert!(self.valid(entity), "entity {entity} is not in use");
        self.base.erase(entity);
    }

    /// Retire `entity` if it is live. Returns `true` if it was retired.
    pub fn remove(&mut self, entity: Entity) -> bool {
        if self.valid(entity) {
            self.base.erase(entity);
            true
        } else {
            false
        }
    }

    /// Move the given live identifiers to the back of the live prefix, the first of them last.
    ///
    /// Returns the slot where they start, not their count: the packed identifiers occupy
    /// `start..in_use()`, and the ones before `start` were not named.
    pub fn pack(&mut self, entities: &[Entity]) -> usize {
        let mut len = self.in_use();
        for &entity in entities {
            debug_assert!(self.valid(entity), "entity {entity} is not in use");
            self.base.swap_at(self.base.index(entity), len - 1);
            len -= 1;
        }
        len
    }

    /// Iterate the live identifiers in slot order.
    pub fn each(&self) -> impl Iterator<Item = Entity> + '_ {
        self.base.data()[..self.in_use()].iter().copied()
    }

    /// Retire every live identifier.
    pub fn clear(&mut self) {
        for pos in 0..self.in_use() {
            let entity = self.base.at(pos);
            self.base.bump(entity.next());
        }
        self.base.set_free_list(0);
    }
}

impl Default for EntityStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_hands_out_fresh_indices() {
        // Given
        let mut storage = EntityStorage::new();

        // When
        let spawned = storage.spawn_many(3);

        // Then
        assert_eq!(
            spawned,
            vec![
                Entity::construct(0, 0),
                Entity::construct(1, 0),
                Entity::construct(2, 0)
            ]
        );
        assert_eq!(storage.in_use(), 3);
        assert!(spawned.iter().all(|&e| storage.valid(e)));
    }

    #[test]
    fn spawn_reuses_retired_slot() {
        // Given
        let mut storage = EntityStorage::new();
        let first = storage.spawn();
        let middle = storage.spawn();
        let last = storage.spawn();

        // When
        storage.erase(middle);
        let revived = storage.spawn();

        // Then
        assert_eq!(revived, middle.next());
        assert_eq!(storage.len(), 3);
        assert_eq!(storage.in_use(), 3);
        assert!(!storage.valid(middle));
        assert!(storage.valid(first) && storage.valid(revived) && storage.valid(last));
    }

    #[test]
    fn retired_identifier_is_findable_but_not_valid() {
        // Given
        let mut storage = EntityStorage::new();
        let entity = storage.spawn();
        storage.spawn();

        // When
        storage.erase(entity);

        // Then
        assert!(storage.base().contains(entity.next()));
        assert!(!storage.valid(entity.next()));
        assert_eq!(storage.current(entity), 1);
        assert_eq!(storage.in_use(), 1);
    }

    #[test]
    fn spawn_hint_on_unknown_index_fills_placeholders() {
        // Given
        let mut storage = EntityStorage::new();
        let hint = Entity::construct(5, 3);

        // When
        let spawned = storage.spawn_hint(hint);

        // Then
        assert_eq!(spawned, hint);
        assert_eq!(storage.len(), 6);
        assert_eq!(storage.in_use(), 1);
        assert!(storage.valid(hint));
        assert!(!storage.valid(Entity::construct(2, 0)));
        assert_eq!(storage.current(Entity::construct(2, 0)), 0);

        // When - placeholders are handed out next
        let next = storage.spawn();

        // Then
        assert!(next.index() < 5);
        assert_eq!(next.version(), 0);
        assert_eq!(storage.in_use(), 2);
        assert_eq!(storage.len(), 6);
    }

    #[test]
    fn spawn_hint_on_live_index_falls_back() {
        // Given
        let mut storage = EntityStorage::new();
        let live = storage.spawn();

        // When
        let spawned = storage.spawn_hint(Entity::construct(live.index(), 7));

        // Then
        assert_ne!(spawned.index(), live.index());
        assert!(storage.valid(live));
        assert!(storage.valid(spawned));
    }

    #[test]
    fn spawn_hint_on_retired_index_takes_hint_version() {
        // Given
        let mut storage = EntityStorage::new();
        let entity = storage.spawn();
        storage.spawn();
        storage.erase(entity);

        // When
        let spawned = storage.spawn_hint(Entity::construct(entity.index(), 9));

        // Then
        assert_eq!(spawned, Entity::construct(entity.index(), 9));
        assert!(storage.valid(spawned));
        assert_eq!(storage.in_use(), 2);
    }

    #[test]
    fn spawn_hint_with_null_spawns() {
        // Given
        let mut storage = EntityStorage::new();

        // When
        let spawned = storage.spawn_hint(Entity::NULL);

        // Then
        assert_eq!(spawned, Entity::construct(0, 0));
    }

    #[test]
    fn pack_moves_to_back_of_live_prefix() {
        // Given
        let mut storage = EntityStorage::new();
        let spawned = storage.spawn_many(5);

        // When
        let start = storage.pack(&[spawned[1], spawned[3]]);

        // Then
        assert_eq!(start, 3);
        assert_eq!(storage.in_use() - start, 2);
        assert_eq!(storage.base().index(spawned[1]), 4);
        assert_eq!(storage.base().index(spawned[3]), 3);
        assert_eq!(storage.in_use(), 5);
    }

    #[test]
    fn each_and_set_in_use() {
        // Given
        let mut storage = EntityStorage::new();
        let spawned = storage.spawn_many(4);

        // When
        storage.set_in_use(2);

        // Then
        assert_eq!(storage.each().collect::<Vec<_>>(), spawned[..2].to_vec());
        assert!(!storage.valid(spawned[3]));
        assert_eq!(storage.spawn(), spawned[2]);
    }

    #[test]
    fn clear_retires_everything() {
        // Given
        let mut storage = EntityStorage::new();
        let spawned = storage.spawn_many(3);

        // When
        storage.clear();

        // Then
        assert_eq!(storage.in_use(), 0);
        assert_eq!(storage.len(), 3);
        assert!(spawned.iter().all(|&e| !storage.valid(e)));
        assert!(spawned.iter().all(|&e| storage.current(e) == 1));
        assert_eq!(storage.spawn().version(), 1);
    }

    #[test]
    fn remove_tolerates_dead_identifiers() {
        // Given
        let mut storage = EntityStorage::new();
        let entity = storage.spawn();

        // Then
        assert!(storage.remove(entity));
        assert!(!storage.remove(entity));
        assert!(!storage.remove(Entity::construct(9, 0)));
    }

    #[test]
    fn exhaustion_is_reported() {
        // Given
        let mut storage = EntityStorage::new();
        storage.spawn_hint(Entity::construct(Entity::ENTITY_MASK - 1, 0));
        storage.set_in_use(storage.len());

        // When
        let result = storage.try_spawn();

        // Then
        assert!(matches!(result, Err(Error::Exhausted)));
        assert_eq!(storage.len(), Entity::ENTITY_MASK as usize);
    }
}
