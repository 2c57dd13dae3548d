use std::{cmp::Ordering, mem, ops, slice};

use log::debug;

use crate::ecs::{
    entity::Entity,
    storage::{
        error::{self, Error},
        index::SparseIndex,
    },
};

/// Sentinel `free_list` value meaning "no free slot" for the in-place policy.
const NO_FREE: usize = Entity::ENTITY_MASK as usize;

/// How a [`SparseSet`] reclaims the slot of an erased entity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeletionPolicy {
    /// The last slot is moved into the hole and the packed array shrinks.
    ///
    /// Cheapest option, but every erase may relocate one surviving entity.
    #[default]
    SwapAndPop,

    /// The slot is overwritten with a tombstone and threaded onto an intrusive free list.
    ///
    /// Surviving entities never move until [`SparseSet::compact`] is called.
    InPlace,

    /// The slot is swapped to the live boundary and its entity gets its version bumped.
    ///
    /// The packed array never shrinks; retired entities stay findable at their next version and
    /// are reused by a later push. Intended for identifier pools.
    SwapOnly,
}

/// The payload side of a storage, kept slot-aligned with a [`SparseSet`].
///
/// Every time the set moves an entity from one slot to another it mirrors the move through this
/// trait. `relocate` exchanges the contents of both slots; when `to` is vacant this is a plain move.
pub trait Relocate {
    fn relocate(&mut self, from: usize, to: usize);
}

/// Payload-free sets move nothing.
impl Relocate for () {
    #[inline]
    fn relocate(&mut self, _from: usize, _to: usize) {}
}

/// A sparse set of entities.
///
/// The set is made of two arrays:
/// - a paged [`SparseIndex`] from entity index to slot, also recording the current version of every
///   index it has seen;
/// - a packed array of entities, in slot order, that is what iteration walks.
///
/// ```text
///   sparse (paged)                        packed
///   ┌────┬────┬────┬────┐                ┌────┬────┬────┐
///   │null│ 2v0│null│ 0v1│  ...           │ 3v1│ 7v0│ 1v0│
///   └────┴────┴────┴────┘                └────┴────┴────┘
///     0    1    2    3   entity index      0    1    2    slot
/// ```
///
/// Erasing follows one of three [`DeletionPolicy`] state machines. The `free_list` cursor means
/// something different for each of them:
///
/// | Policy | `free_list()` |
/// |--------|---------------|
/// | swap-and-pop | always the "no free slot" sentinel |
/// | in-place | head of the intrusive chain of tombstoned slots, or the sentinel |
/// | swap-only | number of live slots; slots past it hold retired entities |
///
/// Contract violations (erasing an absent entity, pushing a present one, sorting with tombstones)
/// panic in debug builds and leave the set in an unspecified but memory safe state otherwise.
#[derive(Debug)]
pub struct SparseSet {
    sparse: SparseIndex,
    packed: Vec<Entity>,
    policy: DeletionPolicy,
    head: usize,
}

#[inline]
fn slot_entry(slot: usize, entity: Entity) -> Entity {
    Entity::construct(slot as u32, entity.version())
}

impl SparseSet {
    /// Create an empty set with the given deletion policy and the default sparse page size.
    pub fn new(policy: DeletionPolicy) -> Self {
        Self::with_page_size(policy, SparseIndex::DEFAULT_PAGE_SIZE)
    }

    /// Create an empty set with a custom sparse page size (a power of two).
    pub fn with_page_size(policy: DeletionPolicy, page_size: usize) -> Self {
        Self {
            sparse: SparseIndex::with_page_size(page_size),
            packed: Vec::new(),
            policy,
            head: Self::policy_to_head(policy),
        }
    }

    #[inline]
    fn policy_to_head(policy: DeletionPolicy) -> usize {
        match policy {
            DeletionPolicy::SwapOnly => 0,
            DeletionPolicy::SwapAndPop | DeletionPolicy::InPlace => NO_FREE,
        }
    }

    /// The "no free slot" sentinel returned by [`SparseSet::free_list`].
    #[inline]
    pub const fn no_free_slot() -> usize {
        NO_FREE
    }

    #[inline]
    pub fn policy(&self) -> DeletionPolicy {
        self.policy
    }

    /// Number of slots, tombstones and retired entities included.
    #[inline]
    pub fn len(&self) -> usize {
        self.packed.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packed.is_empty()
    }

    /// Number of entity indices addressable without growing the sparse index.
    #[inline]
    pub fn extent(&self) -> usize {
        self.sparse.extent()
    }

    /// Capacity of the packed array.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.packed.capacity()
    }

    /// The sparse index, mostly useful for diagnostics.
    #[inline]
    pub fn sparse(&self) -> &SparseIndex {
        &self.sparse
    }

    /// The packed array, in slot order. May contain tombstones (in-place policy) and retired
    /// entities (swap-only policy).
    #[inline]
    pub fn data(&self) -> &[Entity] {
        &self.packed
    }

    /// Iterate the packed array in slot order.
    #[inline]
    pub fn iter(&self) -> std::iter::Copied<slice::Iter<'_, Entity>> {
        self.packed.iter().copied()
    }

    /// The entity at `slot`, or [`Entity::NULL`] when out of range.
    #[inline]
    pub fn at(&self, slot: usize) -> Entity {
        self.packed.get(slot).copied().unwrap_or(Entity::NULL)
    }

    /// The current free list cursor. See the table on [`SparseSet`].
    #[inline]
    pub fn free_list(&self) -> usize {
        self.head
    }

    /// Move the live boundary of a swap-only set.
    ///
    /// # Panics
    ///
    /// Debug builds panic for other policies or when `len` exceeds the number of slots.
    pub fn set_free_list(&mut self, len: usize) {
        debug_assert!(
            self.policy == DeletionPolicy::SwapOnly && len <= self.packed.len(),
            "invalid free list length {len}"
        );
        self.head = len;
    }

    /// Returns `true` if no tombstone lives in the packed array.
    #[inline]
    pub fn contiguous(&self) -> bool {
        self.policy != DeletionPolicy::InPlace || self.head == NO_FREE
    }

    /// Returns `true` if the set holds `entity` at exactly its version.
    ///
    /// Under the swap-only policy an erased entity remains findable at its bumped version, so
    /// `contains(entity.next())` holds right after `erase(entity)`.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        matches!(
            self.sparse.entry(entity),
            Some(elem) if !elem.is_null() && elem.version() == entity.version()
        )
    }

    /// The slot of `entity`.
    ///
    /// # Panics
    ///
    /// Debug builds panic if the set does not contain `entity`.
    #[inline]
    pub fn index(&self, entity: Entity) -> usize {
        debug_assert!(self.contains(entity), "set does not contain {entity}");
        self.slot_of(entity)
    }

    /// The slot of `entity`, or `None` if the set does not contain it.
    #[inline]
    pub fn find(&self, entity: Entity) -> Option<usize> {
        self.contains(entity).then(|| self.slot_of(entity))
    }

    /// The version on record for the index of `entity`, or the tombstone version if unknown.
    #[inline]
    pub fn current(&self, entity: Entity) -> u32 {
        match self.sparse.entry(entity) {
            Some(elem) if !elem.is_null() => elem.version(),
            _ => Entity::VERSION_MASK,
        }
    }

    /// Slot lookup without any membership check.
    #[inline]
    fn slot_of(&self, entity: Entity) -> usize {
        self.sparse.entry(entity).map_or(NO_FREE, |elem| elem.slot())
    }

    #[inline]
    fn sparse_mut(&mut self, entity: Entity) -> &mut Entity {
        match self.sparse.entry_mut(entity) {
            Some(elem) => elem,
            None => panic!("no sparse entry for {entity}"),
        }
    }

    /// Reserve capacity for at least `capacity` slots in total.
    pub fn try_reserve(&mut self, capacity: usize) -> Result<(), Error> {
        let additional = capacity.saturating_sub(self.packed.len());
        self.packed.try_reserve(additional)?;
        Ok(())
    }

    /// Infallible [`SparseSet::try_reserve`].
    pub fn reserve(&mut self, capacity: usize) {
        error::infallible(self.try_reserve(capacity))
    }

    /// Release unused packed capacity. Sparse pages are kept: the extent never shrinks.
    pub fn shrink_to_fit(&mut self) {
        self.packed.shrink_to_fit();
    }

    /// Assign a slot to `entity` and return it.
    ///
    /// - swap-and-pop: appends.
    /// - in-place: reuses the most recently tombstoned slot, or appends.
    /// - swap-only: places the entity at the live boundary, reviving its retired slot if it has
    ///   one, and grows the live range by one.
    ///
    /// On allocation failure the set is unchanged and does not contain `entity`.
    ///
    /// # Panics
    ///
    /// Debug builds panic if `entity` is null, a tombstone or already present.
    pub fn try_push(&mut self, entity: Entity) -> Result<usize, Error> {
        self.try_push_inner(entity, false)
    }

    /// Infallible [`SparseSet::try_push`].
    pub fn push(&mut self, entity: Entity) -> usize {
        error::infallible(self.try_push(entity))
    }

    /// Push a batch of entities. Under the in-place policy the batch is appended and never fills
    /// tombstoned slots.
    ///
    /// On allocation failure the entities pushed so far stay in the set.
    pub fn try_push_many(&mut self, entities: &[Entity]) -> Result<(), Error> {
        self.packed.try_reserve(entities.len())?;
        for &entity in entities {
            self.try_push_inner(entity, true)?;
        }
        Ok(())
    }

    /// Infallible [`SparseSet::try_push_many`].
    pub fn push_many(&mut self, entities: &[Entity]) {
        error::infallible(self.try_push_many(entities))
    }

    /// The slot a plain [`SparseSet::try_push`] of a new entity would take.
    #[inline]
    pub(crate) fn next_slot(&self) -> usize {
        match self.policy {
            DeletionPolicy::InPlace if self.head != NO_FREE => self.head,
            DeletionPolicy::SwapOnly => self.head,
            DeletionPolicy::InPlace | DeletionPolicy::SwapAndPop => self.packed.len(),
        }
    }

    pub(crate) fn try_push_inner(&mut self, entity: Entity, force_back: bool) -> Result<usize, Error> {
        debug_assert!(
            !entity.is_null() && !entity.is_tombstone(),
            "cannot push a reserved entity"
        );
        self.packed.try_reserve(1)?;
        let elem = self.sparse.try_assure(entity)?;

        match self.policy {
            DeletionPolicy::InPlace if self.head != NO_FREE && !force_back => {
                debug_assert!(elem.is_null(), "slot not available for {entity}");
                let pos = self.head;
                *elem = slot_entry(pos, entity);
                self.head = mem::replace(&mut self.packed[pos], entity).slot();
                Ok(pos)
            }
            DeletionPolicy::InPlace | DeletionPolicy::SwapAndPop => {
                debug_assert!(elem.is_null(), "slot not available for {entity}");
                *elem = slot_entry(self.packed.len(), entity);
                self.packed.push(entity);
                Ok(self.packed.len() - 1)
            }
            DeletionPolicy::SwapOnly => {
                let from = if elem.is_null() {
                    *elem = slot_entry(self.packed.len(), entity);
                    self.packed.push(entity);
                    self.packed.len() - 1
                } else {
                    debug_assert!(elem.slot() >= self.head, "slot not available for {entity}");
                    *elem = Entity::combine(*elem, entity);
                    let from = elem.slot();
                    self.packed[from] = entity;
                    from
                };
                let pos = self.head;
                self.head += 1;
                self.swap_at(from, pos);
                Ok(pos)
            }
        }
    }

    /// Overwrite the version on record for the index of `entity` with the version of `entity`.
    ///
    /// # Panics
    ///
    /// Debug builds panic if the index is unknown or `entity` carries the tombstone version.
    pub fn bump(&mut self, entity: Entity) -> u32 {
        debug_assert!(!entity.is_tombstone(), "cannot set the tombstone version");
        let pos = {
            let elem = self.sparse_mut(entity);
            debug_assert!(!elem.is_null(), "set does not contain index of {entity}");
            *elem = Entity::combine(*elem, entity);
            elem.slot()
        };
        self.packed[pos] = entity;
        entity.version()
    }

    /// Erase `entity` according to the deletion policy.
    ///
    /// # Panics
    ///
    /// Debug builds panic if the set does not contain `entity`.
    pub fn erase(&mut self, entity: Entity) {
        self.erase_with(entity, &mut ());
    }

    /// Erase every entity of a batch, walking it from last to first.
    pub fn erase_many(&mut self, entities: &[Entity]) {
        for &entity in entities.iter().rev() {
            self.erase(entity);
        }
    }

    /// Erase `entity` if present. Returns `true` if it was erased.
    pub fn remove(&mut self, entity: Entity) -> bool {
        if self.contains(entity) {
            self.erase(entity);
            true
        } else {
            false
        }
    }

    /// Remove every entity of a batch that is present, walking it from last to first. Returns the
    /// number of erased entities.
    pub fn remove_many(&mut self, entities: &[Entity]) -> usize {
        entities.iter().rev().filter(|&&entity| self.remove(entity)).count()
    }

    pub(crate) fn erase_with<R: Relocate + ?Sized>(&mut self, entity: Entity, payload: &mut R) {
        debug_assert!(self.contains(entity), "set does not contain {entity}");
        match self.policy {
            DeletionPolicy::SwapAndPop => self.swap_and_pop(entity, payload),
            DeletionPolicy::InPlace => self.in_place_pop(entity),
            DeletionPolicy::SwapOnly => self.swap_only_pop(entity),
        }
    }

    fn swap_and_pop<R: Relocate + ?Sized>(&mut self, entity: Entity, payload: &mut R) {
        let pos = self.slot_of(entity);
        let last = self.packed.len() - 1;
        let moved = self.packed[last];

        *self.sparse_mut(moved) = slot_entry(pos, moved);
        self.packed[pos] = moved;
        *self.sparse_mut(entity) = Entity::NULL;
        self.packed.pop();

        if pos != last {
            payload.relocate(last, pos);
        }
    }

    fn in_place_pop(&mut self, entity: Entity) {
        let pos = mem::replace(self.sparse_mut(entity), Entity::NULL).slot();
        let next = mem::replace(&mut self.head, pos);
        self.packed[pos] = Entity::construct(next as u32, Entity::VERSION_MASK);
    }

    fn swap_only_pop(&mut self, entity: Entity) {
        let pos = self.slot_of(entity);
        self.bump(entity.next());
        if pos < self.head {
            self.head -= 1;
        }
        self.swap_at(pos, self.head);
    }

    /// Erase every entity and release the sparse pages.
    pub fn clear(&mut self) {
        self.packed.clear();
        self.sparse.clear();
        self.head = Self::policy_to_head(self.policy);
    }

    /// Exchange two slots, updating the sparse index. No payload is moved.
    pub(crate) fn swap_at(&mut self, lhs: usize, rhs: usize) {
        let from = self.packed[lhs];
        let to = self.packed[rhs];
        *self.sparse_mut(from) = slot_entry(rhs, from);
        *self.sparse_mut(to) = slot_entry(lhs, to);
        self.packed.swap(lhs, rhs);
    }

    /// Exchange the slots of two contained entities.
    ///
    /// # Panics
    ///
    /// Debug builds panic if either entity is not contained.
    pub fn swap_elements(&mut self, lhs: Entity, rhs: Entity) {
        self.swap_elements_with(lhs, rhs, &mut ());
    }

    pub(crate) fn swap_elements_with<R: Relocate + ?Sized>(
        &mut self,
        lhs: Entity,
        rhs: Entity,
        payload: &mut R,
    ) {
        let from = self.index(lhs);
        let to = self.index(rhs);
        self.swap_slots_with(from, to, payload);
    }

    #[inline]
    fn swap_slots_with<R: Relocate + ?Sized>(&mut self, from: usize, to: usize, payload: &mut R) {
        payload.relocate(from, to);
        self.swap_at(from, to);
    }

    /// Squeeze tombstones out of an in-place set, moving trailing entities into the holes. A no-op
    /// for the other policies.
    pub fn compact(&mut self) {
        self.compact_with(&mut ());
    }

    pub(crate) fn compact_with<R: Relocate + ?Sized>(&mut self, payload: &mut R) {
        if self.policy != DeletionPolicy::InPlace {
            return;
        }

        let before = self.packed.len();
        let mut from = before;
        let mut pos = mem::replace(&mut self.head, NO_FREE);

        while from > 0 && self.packed[from - 1].is_tombstone() {
            from -= 1;
        }

        while pos != NO_FREE {
            let to = pos;
            pos = self.packed[to].slot();

            if to < from {
                from -= 1;
                payload.relocate(from, to);
                let moved = self.packed[from];
                self.packed[to] = moved;
                *self.sparse_mut(moved) = slot_entry(to, moved);

                while from > 0 && self.packed[from - 1].is_tombstone() {
                    from -= 1;
                }
            }
        }

        self.packed.truncate(from);
        debug!("compacted sparse set from {before} to {from} slots");
    }

    /// The number of leading slots taken into account by [`SparseSet::sort_by`].
    #[inline]
    pub(crate) fn sortable_len(&self) -> usize {
        match self.policy {
            DeletionPolicy::SwapOnly => self.head,
            DeletionPolicy::SwapAndPop | DeletionPolicy::InPlace => self.packed.len(),
        }
    }

    fn assert_sortable(&self, length: usize) {
        debug_assert!(self.contiguous(), "sorting with tombstones is not allowed");
        debug_assert!(
            length <= self.sortable_len(),
            "length {length} exceeds the number of sortable elements"
        );
    }

    /// Sort the live entities so that iterating the set visits them in `compare` order.
    ///
    /// # Panics
    ///
    /// Debug builds panic if the set contains tombstones.
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&Entity, &Entity) -> Ordering,
    {
        self.sort_n_by(self.sortable_len(), compare);
    }

    /// Sort only the first `length` slots.
    ///
    /// # Panics
    ///
    /// Debug builds panic if the set contains tombstones or `length` is out of range (past the
    /// live boundary for swap-only sets).
    pub fn sort_n_by<F>(&mut self, length: usize, compare: F)
    where
        F: FnMut(&Entity, &Entity) -> Ordering,
    {
        self.sort_n_by_with(length, compare, &mut ());
    }

    pub(crate) fn sort_n_by_with<F, R>(&mut self, length: usize, compare: F, payload: &mut R)
    where
        F: FnMut(&Entity, &Entity) -> Ordering,
        R: Relocate + ?Sized,
    {
        self.assert_sortable(length);
        self.packed[..length].sort_by(compare);
        self.apply_order(length, payload);
    }

    /// First half of a payload-aware sort: reorders the first `length` packed entries by comparing
    /// their slots as they were before the call. The sparse index is stale until
    /// [`SparseSet::apply_order`] runs.
    pub(crate) fn sort_packed_by_slot<F>(&mut self, length: usize, mut compare: F)
    where
        F: FnMut(usize, usize) -> Ordering,
    {
        self.assert_sortable(length);
        let sparse = &self.sparse;
        let slot = |entity: &Entity| sparse.entry(*entity).map_or(NO_FREE, |elem| elem.slot());
        self.packed[..length].sort_by(|lhs, rhs| compare(slot(lhs), slot(rhs)));
    }

    /// Second half of a sort: follows the permutation cycles between the stale sparse index and
    /// the reordered packed array, moving the payload along and fixing the sparse index.
    pub(crate) fn apply_order<R: Relocate + ?Sized>(&mut self, length: usize, payload: &mut R) {
        for pos in 0..length {
            let mut curr = pos;
            let mut next = self.slot_of(self.packed[curr]);

            while curr != next {
                let idx = self.slot_of(self.packed[next]);
                let entity = self.packed[curr];

                if next != idx {
                    payload.relocate(next, idx);
                }
                *self.sparse_mut(entity) = slot_entry(curr, entity);

                curr = next;
                next = idx;
            }
        }
    }

    /// Reorder this set so that the entities it shares with `other` appear in the same relative
    /// order as they do in `other`.
    ///
    /// `other` is walked from its last slot to its first; each shared entity is swapped into a
    /// cursor that starts at this set's last live slot and moves towards the front. Shared
    /// entities therefore end up packed at the back, in `other`'s order. Entities missing from
    /// `other` are left wherever the swaps put them: this is a single linear pass, not a stable
    /// sort.
    ///
    /// # Panics
    ///
    /// Debug builds panic if this set contains tombstones.
    pub fn sort_as(&mut self, other: &SparseSet) {
        self.sort_as_with(other, &mut ());
    }

    pub(crate) fn sort_as_with<R: Relocate + ?Sized>(&mut self, other: &SparseSet, payload: &mut R) {
        debug_assert!(self.contiguous(), "sorting with tombstones is not allowed");
        let len = self.sortable_len();
        let mut cursor = len;

        for entity in other.packed.iter().rev().copied() {
            if cursor == 0 {
                break;
            }

            if self.contains(entity) {
                let pos = self.slot_of(entity);
                if pos >= len {
                    continue;
                }

                cursor -= 1;
                if pos != cursor {
                    self.swap_slots_with(pos, cursor, payload);
                }
            }
        }
    }
}

impl Default for SparseSet {
    fn default() -> Self {
        Self::new(DeletionPolicy::default())
    }
}

impl ops::Index<usize> for SparseSet {
    type Output = Entity;

    #[inline]
    fn index(&self, slot: usize) -> &Entity {
        &self.packed[slot]
    }
}

impl<'a> IntoIterator for &'a SparseSet {
    type Item = Entity;
    type IntoIter = std::iter::Copied<slice::Iter<'a, Entity>>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
