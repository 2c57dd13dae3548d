use std::{cmp::Ordering, mem};

use crate::ecs::{
    component::Component,
    entity::Entity,
    storage::{
        column::Column,
        error::{self, Error},
        sparse_set::{DeletionPolicy, SparseSet},
    },
};

/// Typed storage: a [`SparseSet`] plus one payload value per live slot.
///
/// The deletion policy comes from the component type (see [`Component::policy`]). Every slot
/// move performed by the set is mirrored on the payload column, so `get(e)` always finds the value
/// that was emplaced for `e`.
///
/// Payload values live in fixed-size pages that are never reallocated, so a reference obtained
/// from [`Storage::get`] stays valid while other entities are emplaced. With the in-place policy,
/// it also survives erasing other entities.
///
/// # Exception safety
///
/// | Operation | On failure |
/// |-----------|------------|
/// | `try_emplace`, `try_emplace_with`, `try_reserve` | storage unchanged |
/// | `insert`, `insert_from` | entities handled before the failure stay inserted |
pub struct Storage<T: Component> {
    base: SparseSet,
    column: Column<T>,
}

impl<T: Component> Storage<T> {
    /// Create an empty storage with the default sparse page size.
    pub fn new() -> Self {
        Self::with_page_size(crate::ecs::storage::SparseIndex::DEFAULT_PAGE_SIZE)
    }

    /// Create an empty storage with a custom sparse page size.
    pub fn with_page_size(page_size: usize) -> Self {
        const {
            assert!(
                !T::PINNED || T::IN_PLACE_DELETE,
                "pinned components must use in-place deletion"
            );
            assert!(
                mem::size_of::<T>() == 0 || T::PAGE_SIZE.is_power_of_two(),
                "component page size must be a power of two"
            );
        }

        Self {
            base: SparseSet::with_page_size(T::policy(), page_size),
            column: Column::new(),
        }
    }

    /// The underlying sparse set.
    #[inline]
    pub fn base(&self) -> &SparseSet {
        &self.base
    }

    #[inline]
    pub fn policy(&self) -> DeletionPolicy {
        self.base.policy()
    }

    /// Number of slots, tombstones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.base.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.base.contains(entity)
    }

    #[inline]
    pub fn index(&self, entity: Entity) -> usize {
        self.base.index(entity)
    }

    /// Iterate the packed entities in slot order, tombstones included.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.base.iter()
    }

    /// Number of payload values that fit without allocating a page.
    pub fn capacity(&self) -> usize {
        if Column::<T>::PAGELESS {
            self.base.capacity()
        } else {
            self.column.capacity()
        }
    }

    /// Make room for at least `capacity` values in total.
    pub fn try_reserve(&mut self, capacity: usize) -> Result<(), Error> {
        if capacity > 0 {
            self.column.try_assure(capacity - 1)?;
        }
        self.base.try_reserve(capacity)
    }

    /// Infallible [`Storage::try_reserve`].
    pub fn reserve(&mut self, capacity: usize) {
        error::infallible(self.try_reserve(capacity))
    }

    /// Release the packed capacity and the payload pages past the last slot.
    pub fn shrink_to_fit(&mut self) {
        self.base.shrink_to_fit();
        self.column.shrink(self.base.len());
    }

    /// Attach `value` to `entity` and return a reference to it.
    ///
    /// On allocation failure the storage is left unchanged and `value` is dropped.
    ///
    /// # Panics
    ///
    /// Debug builds panic if `entity` is already present.
    pub fn try_emplace(&mut self, entity: Entity, value: T) -> Result<&mut T, Error> {
        let slot = self.base.next_slot();
        self.column.try_assure(slot)?;
        let pos = self.base.try_push(entity)?;
        debug_assert_eq!(pos, slot);
        Ok(self.column.write(pos, value))
    }

    /// Like [`Storage::try_emplace`], building the value first. If `make` panics nothing was
    /// reserved and the storage does not contain `entity`.
    pub fn try_emplace_with<F>(&mut self, entity: Entity, make: F) -> Result<&mut T, Error>
    where
        F: FnOnce() -> T,
    {
        let value = make();
        self.try_emplace(entity, value)
    }

    /// Infallible [`Storage::try_emplace`].
    pub fn emplace(&mut self, entity: Entity, value: T) -> &mut T {
        error::infallible(self.try_emplace(entity, value))
    }

    /// Infallible [`Storage::try_emplace_with`].
    pub fn emplace_with<F>(&mut self, entity: Entity, make: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        error::infallible(self.try_emplace_with(entity, make))
    }

    /// Attach a clone of `value` to every entity of a batch. Entities are appended, never placed
    /// in tombstoned slots.
    pub fn insert(&mut self, entities: &[Entity], value: T)
    where
        T: Clone,
    {
        error::infallible(self.try_insert_with(entities, || value.clone()))
    }

    /// Attach the values yielded by `values` to the entities of a batch, pairwise.
    ///
    /// # Panics
    ///
    /// Panics if `values` yields fewer values than there are entities; the entities before the
    /// shortfall stay inserted.
    pub fn insert_from<I>(&mut self, entities: &[Entity], values: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut values = values.into_iter();
        error::infallible(self.try_insert_with(entities, || match values.next() {
            Some(value) => value,
            None => panic!("fewer values than entities"),
        }))
    }

    /// Each value is produced right before its entity takes a slot, so a panicking `next` leaves
    /// the earlier entities inserted and the rest absent.
    fn try_insert_with<F>(&mut self, entities: &[Entity], mut next: F) -> Result<(), Error>
    where
        F: FnMut() -> T,
    {
        let end = self.base.len() + entities.len();
        self.base.try_reserve(end)?;
        if end > 0 {
            self.column.try_assure(end - 1)?;
        }

        for &entity in entities {
            let value = next();
            let pos = self.base.try_push_inner(entity, true)?;
            self.column.write(pos, value);
        }
        Ok(())
    }

    /// Get the value of `entity`.
    ///
    /// # Panics
    ///
    /// Panics if the storage does not contain `entity`.
    #[inline]
    #[track_caller]
    pub fn get(&self, entity: Entity) -> &T {
        match self.try_get(entity) {
            Some(value) => value,
            None => panic!("storage does not contain {entity}"),
        }
    }

    #[inline]
    #[track_caller]
    pub fn get_mut(&mut self, entity: Entity) -> &mut T {
        match self.try_get_mut(entity) {
            Some(value) => value,
            None => panic!("storage does not contain {entity}"),
        }
    }

    #[inline]
    pub fn try_get(&self, entity: Entity) -> Option<&T> {
        self.base.find(entity).and_then(|pos| self.column.get(pos))
    }

    #[inline]
    pub fn try_get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let pos = self.base.find(entity)?;
        self.column.get_mut(pos)
    }

    /// Update the value of `entity` in place and return it.
    #[track_caller]
    pub fn patch<F>(&mut self, entity: Entity, update: F) -> &mut T
    where
        F: FnOnce(&mut T),
    {
        let value = self.get_mut(entity);
        update(value);
        value
    }

    /// Detach the value of `entity` and drop it.
    ///
    /// With the in-place policy the value is dropped where it lives and no other value moves.
    /// Otherwise the last value is moved into the hole.
    ///
    /// # Panics
    ///
    /// Debug builds panic if the storage does not contain `entity`.
    pub fn erase(&mut self, entity: Entity) {
        let pos = self.base.index(entity);
        match self.base.policy() {
            DeletionPolicy::InPlace => {
                self.base.erase(entity);
                self.column.drop_at(pos);
            }
            DeletionPolicy::SwapAndPop | DeletionPolicy::SwapOnly => {
                let value = self.column.take(pos);
                self.base.erase_with(entity, &mut self.column);
                drop(value);
            }
        }
    }

    /// Erase a batch, walking it from last to first.
    pub fn erase_many(&mut self, entities: &[Entity]) {
        for &entity in entities.iter().rev() {
            self.erase(entity);
        }
    }

    /// Erase `entity` if present. Returns `true` if it was erased.
    pub fn remove(&mut self, entity: Entity) -> bool {
        if self.base.contains(entity) {
            self.erase(entity);
            true
        } else {
            false
        }
    }

    /// Remove the present entities of a batch. Returns how many were erased.
    pub fn remove_many(&mut self, entities: &[Entity]) -> usize {
        entities.iter().rev().filter(|&&entity| self.remove(entity)).count()
    }

    /// Drop every value and forget every entity.
    pub fn clear(&mut self) {
        let live = if Column::<T>::PAGELESS && mem::needs_drop::<T>() {
            self.base.iter().filter(|entity| !entity.is_tombstone()).count()
        } else {
            0
        };
        self.base.clear();
        self.column.clear(live);
    }

    #[inline]
    #[track_caller]
    fn assert_relocatable() {
        assert!(!T::PINNED, "pinned components cannot be relocated");
    }

    /// Squeeze out tombstones. A no-op unless the storage uses in-place deletion.
    ///
    /// # Panics
    ///
    /// Panics for pinned components when there are tombstones to squeeze out.
    pub fn compact(&mut self) {
        if !self.base.contiguous() {
            Self::assert_relocatable();
        }
        self.base.compact_with(&mut self.column);
    }

    /// Exchange the slots of two contained entities along with their values.
    pub fn swap_elements(&mut self, lhs: Entity, rhs: Entity) {
        Self::assert_relocatable();
        self.base.swap_elements_with(lhs, rhs, &mut self.column);
    }

    /// Sort the storage so that iteration visits values in `compare` order. In-place storages are
    /// compacted first.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        Self::assert_relocatable();
        self.compact();
        let len = self.base.len();
        let column = &self.column;
        self.base
            .sort_packed_by_slot(len, |lhs, rhs| compare(column.value(lhs), column.value(rhs)));
        self.base.apply_order(len, &mut self.column);
    }

    /// Sort the storage by entity. In-place storages are compacted first.
    pub fn sort_by_entity<F>(&mut self, compare: F)
    where
        F: FnMut(&Entity, &Entity) -> Ordering,
    {
        Self::assert_relocatable();
        self.compact();
        let len = self.base.len();
        self.base.sort_n_by_with(len, compare, &mut self.column);
    }

    /// Order the entities shared with `other` the way `other` orders them. See
    /// [`SparseSet::sort_as`].
    ///
    /// # Panics
    ///
    /// Panics for pinned components. Debug builds panic if the storage holds tombstones.
    pub fn sort_as(&mut self, other: &SparseSet) {
        Self::assert_relocatable();
        self.base.sort_as_with(other, &mut self.column);
    }

    /// Iterate `(entity, value)` pairs in slot order, skipping tombstones.
    pub fn each(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.base
            .iter()
            .enumerate()
            .filter(|(_, entity)| !entity.is_tombstone())
            .filter_map(|(pos, entity)| self.column.get(pos).map(|value| (entity, value)))
    }

    /// Iterate `(entity, value)` pairs mutably in slot order, skipping tombstones.
    pub fn each_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        let entities = self.base.data();
        entities
            .iter()
            .copied()
            .zip(self.column.slots_mut(entities.len()))
            .filter(|(entity, _)| !entity.is_tombstone())
            .filter_map(|(entity, slot)| slot.map(|value| (entity, value)))
    }
}

impl<T: Component> Default for Storage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> Drop for Storage<T> {
    fn drop(&mut self) {
        // Zero-sized values are only tracked by the set; run their destructors explicitly.
        if Column::<T>::PAGELESS && mem::needs_drop::<T>() {
            self.clear();
        }
    }
}

impl<T: Component> std::fmt::Debug for Storage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("type", &std::any::type_name::<T>())
            .field("base", &self.base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::Cell,
        panic::{self, AssertUnwindSafe},
        rc::Rc,
    };

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Position(i32, i32);

    impl Component for Position {
        const PAGE_SIZE: usize = 4;
    }

    #[derive(Debug, PartialEq)]
    struct Health(u32);

    impl Component for Health {
        const IN_PLACE_DELETE: bool = true;
    }

    #[derive(Debug)]
    struct Node(u64);

    impl Component for Node {
        const PINNED: bool = true;
        const PAGE_SIZE: usize = 2;
    }

    #[derive(Debug, PartialEq)]
    struct Chunk(u64);

    impl Component for Chunk {
        const PAGE_SIZE: usize = 1 << 60;
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Tag;

    impl Component for Tag {}

    fn entity(index: u32) -> Entity {
        Entity::from(index)
    }

    #[test]
    fn emplace_and_get() {
        // Given
        let mut storage = Storage::<Position>::new();

        // When
        storage.emplace(entity(3), Position(1, 2));
        storage.emplace(entity(42), Position(3, 4));

        // Then
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.get(entity(3)), &Position(1, 2));
        assert_eq!(storage.try_get(entity(42)), Some(&Position(3, 4)));
        assert_eq!(storage.try_get(entity(7)), None);
        assert_eq!(storage.try_get(Entity::construct(3, 1)), None);
    }

    #[test]
    fn failed_emplace_leaves_the_storage_unchanged() {
        // Given
        let mut storage = Storage::<Chunk>::new();

        // When
        let result = storage.try_emplace(entity(1), Chunk(7));

        // Then
        assert!(matches!(result, Err(Error::Alloc(_))));
        assert!(!storage.contains(entity(1)));
        assert!(storage.is_empty());
        assert_eq!(storage.capacity(), 0);
        assert_eq!(storage.base().extent(), 0);
    }

    #[test]
    fn patch_updates_in_place() {
        // Given
        let mut storage = Storage::<Position>::new();
        storage.emplace(entity(0), Position(0, 0));

        // When
        let patched = storage.patch(entity(0), |pos| pos.0 = 5).clone();

        // Then
        assert_eq!(patched, Position(5, 0));
        assert_eq!(storage.get(entity(0)), &Position(5, 0));
    }

    #[test]
    fn swap_and_pop_erase_moves_last_value() {
        // Given
        let mut storage = Storage::<Position>::new();
        for i in 0..6 {
            storage.emplace(entity(i), Position(i as i32, 0));
        }

        // When
        storage.erase(entity(1));

        // Then
        assert_eq!(storage.len(), 5);
        assert_eq!(storage.index(entity(5)), 1);
        assert_eq!(storage.get(entity(5)), &Position(5, 0));
        assert!(!storage.contains(entity(1)));
        for i in [0, 2, 3, 4, 5] {
            assert_eq!(storage.get(entity(i)).0, i as i32);
        }
    }

    #[test]
    fn in_place_erase_keeps_slots_and_reuses_holes() {
        // Given
        let mut storage = Storage::<Health>::new();
        storage.emplace(entity(0), Health(10));
        storage.emplace(entity(1), Health(20));
        storage.emplace(entity(2), Health(30));

        // When
        storage.erase(entity(1));

        // Then
        assert_eq!(storage.len(), 3);
        assert_eq!(storage.index(entity(2)), 2);
        assert_eq!(storage.each().count(), 2);

        // When
        storage.emplace(entity(7), Health(70));

        // Then
        assert_eq!(storage.index(entity(7)), 1);
        assert_eq!(storage.get(entity(7)), &Health(70));
    }

    #[test]
    fn compact_then_sort_in_place_storage() {
        // Given
        let mut storage = Storage::<Health>::new();
        for (i, hp) in [5, 1, 4, 2, 3].into_iter().enumerate() {
            storage.emplace(entity(i as u32), Health(hp));
        }
        storage.erase(entity(2));

        // When
        storage.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0));

        // Then
        assert_eq!(storage.len(), 4);
        let values: Vec<_> = storage.each().map(|(_, hp)| hp.0).collect();
        assert_eq!(values, vec![1, 2, 3, 5]);
        for (e, hp) in storage.each() {
            assert_eq!(storage.get(e).0, hp.0);
        }
    }

    #[test]
    fn sort_by_value_moves_payload() {
        // Given
        let mut storage = Storage::<Position>::new();
        for (i, x) in [9, 3, 7, 1, 5, 8].into_iter().enumerate() {
            storage.emplace(entity(i as u32), Position(x, i as i32));
        }

        // When
        storage.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0));

        // Then
        let xs: Vec<_> = storage.each().map(|(_, pos)| pos.0).collect();
        assert_eq!(xs, vec![1, 3, 5, 7, 8, 9]);
        for (e, pos) in storage.each() {
            assert_eq!(pos.1 as usize, e.slot());
        }
    }

    #[test]
    fn sort_by_entity_and_sort_as() {
        // Given
        let mut lhs = Storage::<Position>::new();
        let mut rhs = Storage::<Health>::new();
        for i in [4, 1, 3, 0] {
            lhs.emplace(entity(i), Position(i as i32, 0));
        }
        for i in [0, 1, 3, 4] {
            rhs.emplace(entity(i), Health(i));
        }

        // When
        lhs.sort_by_entity(|a, b| b.cmp(a));

        // Then
        let order: Vec<_> = lhs.iter().map(Entity::index).collect();
        assert_eq!(order, vec![4, 3, 1, 0]);

        // When
        lhs.sort_as(rhs.base());

        // Then
        let order: Vec<_> = lhs.iter().map(Entity::index).collect();
        assert_eq!(order, vec![0, 1, 3, 4]);
        for (e, pos) in lhs.each() {
            assert_eq!(pos.0 as u32, e.index());
        }
    }

    #[test]
    fn swap_elements_moves_values() {
        // Given
        let mut storage = Storage::<Position>::new();
        storage.emplace(entity(0), Position(0, 0));
        storage.emplace(entity(1), Position(1, 1));

        // When
        storage.swap_elements(entity(0), entity(1));

        // Then
        assert_eq!(storage.index(entity(0)), 1);
        assert_eq!(storage.get(entity(0)), &Position(0, 0));
        assert_eq!(storage.get(entity(1)), &Position(1, 1));
    }

    #[test]
    fn each_mut_skips_tombstones() {
        // Given
        let mut storage = Storage::<Health>::new();
        for i in 0..4 {
            storage.emplace(entity(i), Health(i));
        }
        storage.erase(entity(1));

        // When
        for (_, hp) in storage.each_mut() {
            hp.0 *= 10;
        }

        // Then
        let values: Vec<_> = storage.each().map(|(e, hp)| (e.index(), hp.0)).collect();
        assert_eq!(values, vec![(0, 0), (2, 20), (3, 30)]);
    }

    #[test]
    fn pinned_values_never_move() {
        // Given
        let mut storage = Storage::<Node>::new();
        storage.emplace(entity(0), Node(0));
        storage.emplace(entity(1), Node(1));
        let address: *const Node = storage.get(entity(1));

        // When - growth and erasure of neighbours
        storage.erase(entity(0));
        for i in 2..64 {
            storage.emplace(entity(i), Node(i as u64));
        }
        storage.erase(entity(40));

        // Then
        assert_eq!(storage.policy(), DeletionPolicy::InPlace);
        assert_eq!(storage.get(entity(1)).0, 1);
        assert_eq!(storage.get(entity(1)) as *const Node, address);
    }

    #[test]
    #[should_panic(expected = "pinned components cannot be relocated")]
    fn pinned_sort_panics() {
        let mut storage = Storage::<Node>::new();
        storage.emplace(entity(0), Node(0));
        storage.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0));
    }

    #[test]
    fn emplace_with_panicking_constructor_leaves_storage_untouched() {
        // Given
        let mut storage = Storage::<Position>::new();
        storage.emplace(entity(0), Position(0, 0));

        // When
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            storage.emplace_with(entity(1), || panic!("constructor failed"));
        }));

        // Then
        assert!(result.is_err());
        assert!(!storage.contains(entity(1)));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn insert_clones_value() {
        // Given
        let mut storage = Storage::<Position>::new();
        let entities: Vec<_> = (0..10).map(entity).collect();

        // When
        storage.insert(&entities, Position(7, 7));

        // Then
        assert_eq!(storage.len(), 10);
        assert!(entities.iter().all(|&e| storage.get(e) == &Position(7, 7)));
    }

    #[test]
    fn insert_appends_past_tombstones() {
        // Given
        let mut storage = Storage::<Health>::new();
        storage.emplace(entity(0), Health(0));
        storage.emplace(entity(1), Health(1));
        storage.erase(entity(0));

        // When
        storage.insert_from(&[entity(5), entity(6)], [Health(5), Health(6)]);

        // Then
        assert_eq!(storage.len(), 4);
        assert_eq!(storage.index(entity(5)), 2);
        assert_eq!(storage.get(entity(6)), &Health(6));
        assert!(!storage.base().contiguous());
    }

    #[test]
    fn insert_with_failing_clone_keeps_earlier_entities() {
        // Given
        struct Fragile(Rc<Cell<u32>>);

        impl Clone for Fragile {
            fn clone(&self) -> Self {
                let budget = self.0.get();
                assert!(budget > 0, "clone budget exhausted");
                self.0.set(budget - 1);
                Fragile(Rc::clone(&self.0))
            }
        }

        impl Component for Fragile {}

        let mut storage = Storage::<Fragile>::new();
        let entities: Vec<_> = (0..5).map(entity).collect();

        // When
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            storage.insert(&entities, Fragile(Rc::new(Cell::new(2))));
        }));

        // Then
        assert!(result.is_err());
        assert!(storage.contains(entity(0)));
        assert!(storage.contains(entity(1)));
        assert!(!storage.contains(entity(2)));
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn tag_storage_is_presence_only() {
        // Given
        let mut storage = Storage::<Tag>::new();

        // When
        storage.emplace(entity(1), Tag);
        storage.emplace(entity(2), Tag);
        storage.erase(entity(1));

        // Then
        assert!(storage.contains(entity(2)));
        assert_eq!(storage.try_get(entity(2)), Some(&Tag));
        assert_eq!(storage.try_get(entity(1)), None);
        assert_eq!(storage.each().count(), 1);
        assert_eq!(storage.capacity(), storage.base().capacity());
    }

    #[test]
    fn tag_destructors_run() {
        // Given
        thread_local! {
            static DROPS: Cell<u32> = const { Cell::new(0) };
        }

        struct Marker;

        impl Drop for Marker {
            fn drop(&mut self) {
                DROPS.with(|drops| drops.set(drops.get() + 1));
            }
        }

        impl Component for Marker {}

        // When
        {
            let mut storage = Storage::<Marker>::new();
            storage.emplace(entity(0), Marker);
            storage.emplace(entity(1), Marker);
            storage.emplace(entity(2), Marker);
            storage.erase(entity(1));
            assert_eq!(DROPS.with(Cell::get), 1);
        }

        // Then
        assert_eq!(DROPS.with(Cell::get), 3);
    }

    #[test]
    fn values_dropped_on_clear() {
        // Given
        let counter = Rc::new(Cell::new(0));

        struct Tracked(Rc<Cell<u32>>);

        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        impl Component for Tracked {}

        let mut storage = Storage::<Tracked>::new();
        for i in 0..3 {
            storage.emplace(entity(i), Tracked(Rc::clone(&counter)));
        }

        // When
        storage.clear();

        // Then
        assert_eq!(counter.get(), 3);
        assert!(storage.is_empty());
        assert!(!storage.contains(entity(0)));
    }

    #[test]
    fn reserve_and_shrink() {
        // Given
        let mut storage = Storage::<Position>::new();

        // When
        storage.reserve(10);

        // Then
        assert!(storage.capacity() >= 10);
        assert!(storage.is_empty());

        // When
        storage.emplace(entity(0), Position(0, 0));
        storage.shrink_to_fit();

        // Then
        assert_eq!(storage.capacity(), Position::PAGE_SIZE);
        assert_eq!(storage.get(entity(0)), &Position(0, 0));
    }

    #[test]
    #[should_panic(expected = "storage does not contain")]
    fn get_absent_panics() {
        let storage = Storage::<Position>::new();
        storage.get(entity(0));
    }

    #[test]
    fn remove_tolerates_absent() {
        // Given
        let mut storage = Storage::<Position>::new();
        storage.emplace(entity(0), Position(0, 0));
        storage.emplace(entity(1), Position(1, 1));

        // When
        let removed = storage.remove_many(&[entity(0), entity(9), entity(1)]);

        // Then
        assert_eq!(removed, 2);
        assert!(storage.is_empty());
        assert!(!storage.remove(entity(0)));
    }
}
