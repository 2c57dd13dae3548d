//! The World ties entity identifiers, component storages, lifecycle signals and groups together.
//!
//! A `World` owns:
//! - an [`EntityStorage`] handing out entity identifiers;
//! - one [`Storage<T>`] per component type, created on first use and kept type-erased;
//! - the [`Hooks`] of every component type;
//! - the groups created through [`World::group`].
//!
//! Every mutation made through the world keeps groups up to date and notifies listeners. Direct
//! mutable access to a storage is not offered for that reason.
//!
//! # Example
//!
//! ```ignore
//! use rusty_sparse::ecs::{Component, World, group::GroupLayout};
//!
//! #[derive(Component)]
//! struct Position(f32, f32);
//!
//! #[derive(Component)]
//! struct Velocity(f32, f32);
//!
//! let mut world = World::new();
//! let group = world.group(GroupLayout::new().owned::<Position>().get::<Velocity>())?;
//!
//! let entity = world.spawn();
//! world.emplace(entity, Position(0.0, 0.0));
//! world.emplace(entity, Velocity(1.0, 0.0));
//! assert_eq!(world.group_len(group), 1);
//!
//! world.despawn(entity);
//! ```

use std::{any::type_name, cmp::Ordering, sync::Arc};

use fixedbitset::FixedBitSet;
use log::{debug, warn};

use crate::ecs::{
    component::{self, Component, Registry},
    entity::Entity,
    group::{Group, GroupError, GroupId, GroupLayout},
    signal::{Connection, Hooks, Lifecycle, Listener},
    storage::{AnyStorage, EntityStorage, Storage},
};

/// The registry-like context: entities, their components and everything reacting to changes.
pub struct World {
    /// Shared component type identity.
    registry: Arc<Registry>,

    /// The identifier pool.
    entities: EntityStorage,

    /// Component storages, indexed by component id.
    pools: Vec<Option<Box<dyn AnyStorage>>>,

    /// Lifecycle signals, indexed by component id.
    hooks: Vec<Hooks>,

    groups: Vec<Group>,

    /// Components owned by a group.
    owned: FixedBitSet,
}

impl World {
    /// Create a world with its own component registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(Registry::new()))
    }

    /// Create a world that shares component ids with other worlds through `registry`.
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            entities: EntityStorage::new(),
            pools: Vec::new(),
            hooks: Vec::new(),
            groups: Vec::new(),
            owned: FixedBitSet::new(),
        }
    }

    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[inline]
    pub fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.in_use()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the live entities.
    pub fn alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.each()
    }

    /// Create the storage of `T` if needed and return its component id.
    pub(crate) fn assure<T: Component>(&mut self) -> component::Id {
        let id = self.registry.register::<T>();
        let index = id.index();
        if index >= self.pools.len() {
            self.pools.resize_with(index + 1, || None);
            self.hooks.resize_with(index + 1, Hooks::default);
        }
        if self.pools[index].is_none() {
            self.pools[index] = Some(Box::new(Storage::<T>::new()));
            debug!("created storage for {} as {:?}", type_name::<T>(), id);
        }
        id
    }

    /// The component id of `T`, if this world has a storage for it.
    fn pool_id<T: Component>(&self) -> Option<component::Id> {
        self.registry
            .get::<T>()
            .filter(|id| self.pools.get(id.index()).is_some_and(Option::is_some))
    }

    fn pool(&self, id: component::Id) -> &dyn AnyStorage {
        match self.pools.get(id.index()).and_then(Option::as_deref) {
            Some(storage) => storage,
            None => panic!("no storage for component {id:?}"),
        }
    }

    fn pool_mut(&mut self, id: component::Id) -> &mut dyn AnyStorage {
        match self.pools.get_mut(id.index()).and_then(Option::as_deref_mut) {
            Some(storage) => storage,
            None => panic!("no storage for component {id:?}"),
        }
    }

    fn typed_mut<T: Component>(&mut self, id: component::Id) -> &mut Storage<T> {
        match self.pool_mut(id).downcast_mut::<T>() {
            Some(storage) => storage,
            None => panic!("storage {id:?} does not hold {}", type_name::<T>()),
        }
    }

    #[track_caller]
    fn expect_pool<T: Component>(&self, entity: Entity) -> component::Id {
        match self.pool_id::<T>() {
            Some(id) => id,
            None => panic!("entity {entity} has no {}", type_name::<T>()),
        }
    }

    /// The storage of `T`, if any component of that type was ever emplaced.
    pub fn storage<T: Component>(&self) -> Option<&Storage<T>> {
        let id = self.pool_id::<T>()?;
        self.pool(id).downcast_ref::<T>()
    }

    /// A storage by component id, type-erased.
    pub fn storage_by_id(&self, id: component::Id) -> Option<&dyn AnyStorage> {
        self.pools.get(id.index()).and_then(Option::as_deref)
    }

    /// Info about every component type this world has a storage for.
    pub fn components(&self) -> Vec<component::Info> {
        self.pools
            .iter()
            .enumerate()
            .filter(|(_, pool)| pool.is_some())
            .filter_map(|(index, _)| self.registry.get_info_by_id(component::Id::from(index)))
            .collect()
    }

    // ============================================================================================
    // Entities
    // ============================================================================================

    /// Create a new entity.
    pub fn spawn(&mut self) -> Entity {
        self.entities.spawn()
    }

    /// Create an entity, reusing `hint` itself when its index is not live.
    pub fn spawn_hint(&mut self, hint: Entity) -> Entity {
        self.entities.spawn_hint(hint)
    }

    /// Returns `true` if `entity` is live at exactly its version.
    #[inline]
    pub fn valid(&self, entity: Entity) -> bool {
        self.entities.valid(entity)
    }

    /// The current version of the index of `entity`.
    #[inline]
    pub fn current(&self, entity: Entity) -> u32 {
        self.entities.current(entity)
    }

    /// Erase every component of `entity`, then retire its identifier.
    ///
    /// Despawning an entity that is not valid is tolerated and logged.
    pub fn despawn(&mut self, entity: Entity) {
        if !self.valid(entity) {
            warn!("despawn of invalid entity {entity}");
            return;
        }

        // Listeners may create storages while we go.
        let mut index = 0;
        while index < self.pools.len() {
            let id = component::Id::from(index);
            if self.storage_by_id(id).is_some_and(|pool| pool.contains(entity)) {
                self.erase_by_id(id, entity);
            }
            index += 1;
        }
        // A destroy listener may have despawned it already.
        self.entities.remove(entity);
    }

    /// Returns `true` if no storage holds a component of `entity`.
    pub fn orphan(&self, entity: Entity) -> bool {
        self.pools
            .iter()
            .flatten()
            .all(|pool| !pool.contains(entity))
    }

    // ============================================================================================
    // Components
    // ============================================================================================

    /// Attach `value` to `entity`, update groups, then notify construct listeners.
    ///
    /// # Panics
    ///
    /// Panics if a construct listener erased the value again. Debug builds panic if `entity` is
    /// not valid or already has a `T`.
    pub fn emplace<T: Component>(&mut self, entity: Entity, value: T) -> &mut T {
        debug_assert!(self.valid(entity), "invalid entity {entity}");
        let id = self.assure::<T>();
        self.typed_mut::<T>(id).emplace(entity, value);
        self.constructed(id, entity);
        self.get_mut::<T>(entity)
    }

    /// Like [`World::emplace`], building the value first. If `make` panics the world is unchanged.
    pub fn emplace_with<T, F>(&mut self, entity: Entity, make: F) -> &mut T
    where
        T: Component,
        F: FnOnce() -> T,
    {
        let value = make();
        self.emplace(entity, value)
    }

    /// Attach a clone of `value` to every entity of a batch.
    pub fn insert<T: Component + Clone>(&mut self, entities: &[Entity], value: T) {
        debug_assert!(
            entities.iter().all(|&entity| self.valid(entity)),
            "invalid entity in batch"
        );
        let id = self.assure::<T>();
        self.typed_mut::<T>(id).insert(entities, value);
        for &entity in entities {
            self.constructed(id, entity);
        }
    }

    /// Update the `T` of `entity` in place, then notify update listeners.
    #[track_caller]
    pub fn patch<T, F>(&mut self, entity: Entity, update: F) -> &mut T
    where
        T: Component,
        F: FnOnce(&mut T),
    {
        let id = self.expect_pool::<T>(entity);
        self.typed_mut::<T>(id).patch(entity, update);
        self.dispatch(id, Lifecycle::Update, entity);
        self.get_mut::<T>(entity)
    }

    /// Overwrite the `T` of `entity`, then notify update listeners.
    #[track_caller]
    pub fn replace<T: Component>(&mut self, entity: Entity, value: T) -> &mut T {
        self.patch(entity, |current: &mut T| *current = value)
    }

    /// Notify destroy listeners, update groups, then drop the `T` of `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` has no `T`.
    #[track_caller]
    pub fn erase<T: Component>(&mut self, entity: Entity) {
        let id = self.expect_pool::<T>(entity);
        assert!(
            self.pool(id).contains(entity),
            "entity {entity} has no {}",
            type_name::<T>()
        );
        self.erase_by_id(id, entity);
    }

    /// Erase the `T` of `entity` if it has one. Returns `true` if it was erased.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> bool {
        match self.pool_id::<T>() {
            Some(id) if self.pool(id).contains(entity) => {
                self.erase_by_id(id, entity);
                true
            }
            _ => false,
        }
    }

    /// Erase the `T` of every entity that has one.
    pub fn clear<T: Component>(&mut self) {
        let Some(id) = self.pool_id::<T>() else {
            return;
        };

        let entities: Vec<_> = self
            .pool(id)
            .set()
            .iter()
            .filter(|entity| !entity.is_tombstone())
            .collect();
        for entity in entities.into_iter().rev() {
            if self.pool(id).contains(entity) {
                self.erase_by_id(id, entity);
            }
        }
        self.pool_mut(id).clear();
    }

    fn erase_by_id(&mut self, id: component::Id, entity: Entity) {
        self.dispatch(id, Lifecycle::Destroy, entity);

        // A listener may have erased it already.
        if !self.pool(id).contains(entity) {
            return;
        }
        for group in &mut self.groups {
            group.on_destroy(id, &mut self.pools, entity);
        }
        self.pool_mut(id).erase(entity);
    }

    fn constructed(&mut self, id: component::Id, entity: Entity) {
        for group in &mut self.groups {
            group.on_construct(id, &mut self.pools, entity);
        }
        self.dispatch(id, Lifecycle::Construct, entity);
    }

    fn dispatch(&mut self, id: component::Id, event: Lifecycle, entity: Entity) {
        let Some(hooks) = self.hooks.get(id.index()) else {
            return;
        };
        let listeners = hooks.signal(event).snapshot();
        for (conn, listener) in listeners {
            // An earlier listener may have disconnected it.
            if self.hooks[id.index()].signal(event).contains(conn) {
                listener(self, entity);
            }
        }
    }

    /// Get the `T` of `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` has no `T`.
    #[track_caller]
    pub fn get<T: Component>(&self, entity: Entity) -> &T {
        match self.try_get::<T>(entity) {
            Some(value) => value,
            None => panic!("entity {entity} has no {}", type_name::<T>()),
        }
    }

    #[track_caller]
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        match self.try_get_mut::<T>(entity) {
            Some(value) => value,
            None => panic!("entity {entity} has no {}", type_name::<T>()),
        }
    }

    pub fn try_get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>()?.try_get(entity)
    }

    /// Mutable access does not notify update listeners; use [`World::patch`] for that.
    pub fn try_get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let id = self.pool_id::<T>()?;
        self.typed_mut::<T>(id).try_get_mut(entity)
    }

    #[inline]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.pool_id::<T>()
            .is_some_and(|id| self.pool(id).contains(entity))
    }

    // ============================================================================================
    // Ordering
    // ============================================================================================

    #[track_caller]
    fn assert_not_owned<T: Component>(&self, id: component::Id) {
        assert!(
            !self.owned.contains(id.index()),
            "component {} is owned by a group",
            type_name::<T>()
        );
    }

    /// Sort the storage of `T` by value.
    ///
    /// # Panics
    ///
    /// Panics if `T` is owned by a group or pinned.
    pub fn sort<T, F>(&mut self, compare: F)
    where
        T: Component,
        F: FnMut(&T, &T) -> Ordering,
    {
        let Some(id) = self.pool_id::<T>() else {
            return;
        };
        self.assert_not_owned::<T>(id);
        self.typed_mut::<T>(id).sort_by(compare);
    }

    /// Order the entities `T` shares with `U` the way the storage of `U` orders them.
    ///
    /// # Panics
    ///
    /// Panics if `T` is owned by a group or pinned. Debug builds panic if the storage of `T` holds
    /// tombstones.
    pub fn sort_as<T: Component, U: Component>(&mut self) {
        let (Some(to), Some(from)) = (self.pool_id::<T>(), self.pool_id::<U>()) else {
            return;
        };
        self.assert_not_owned::<T>(to);
        if to == from {
            return;
        }

        let (target, reference) = if to.index() < from.index() {
            let (head, tail) = self.pools.split_at_mut(from.index());
            (&mut head[to.index()], &tail[0])
        } else {
            let (head, tail) = self.pools.split_at_mut(to.index());
            (&mut tail[0], &head[from.index()])
        };
        if let (Some(target), Some(reference)) = (target, reference) {
            target.sort_as(reference.set());
        }
    }

    // ============================================================================================
    // Signals
    // ============================================================================================

    fn connect<T: Component>(&mut self, event: Lifecycle, listener: Box<Listener>) -> Connection {
        let id = self.assure::<T>();
        self.hooks[id.index()].connect(event, listener)
    }

    /// Call `listener` after a `T` is emplaced.
    pub fn on_construct<T: Component>(
        &mut self,
        listener: impl Fn(&mut World, Entity) + 'static,
    ) -> Connection {
        self.connect::<T>(Lifecycle::Construct, Box::new(listener))
    }

    /// Call `listener` after a `T` is patched or replaced.
    pub fn on_update<T: Component>(
        &mut self,
        listener: impl Fn(&mut World, Entity) + 'static,
    ) -> Connection {
        self.connect::<T>(Lifecycle::Update, Box::new(listener))
    }

    /// Call `listener` before a `T` is erased.
    pub fn on_destroy<T: Component>(
        &mut self,
        listener: impl Fn(&mut World, Entity) + 'static,
    ) -> Connection {
        self.connect::<T>(Lifecycle::Destroy, Box::new(listener))
    }

    /// Disconnect a listener of `T`. Returns `false` if it was not connected.
    ///
    /// Takes effect right away, also for a dispatch in progress: the listener is not called again,
    /// though a call already running finishes.
    pub fn disconnect<T: Component>(&mut self, conn: Connection) -> bool {
        let disconnected = self
            .pool_id::<T>()
            .is_some_and(|id| self.hooks[id.index()].disconnect(conn));
        if !disconnected {
            warn!(
                "listener {} of {} is not connected",
                conn.id(),
                type_name::<T>()
            );
        }
        disconnected
    }

    // ============================================================================================
    // Groups
    // ============================================================================================

    /// Create a group, or return the existing one with an identical layout. Entities that already
    /// match are incorporated right away.
    pub fn group(&mut self, layout: GroupLayout) -> Result<GroupId, GroupError> {
        if let Some(pos) = self.groups.iter().position(|group| group.layout() == &layout) {
            return Ok(GroupId(pos));
        }

        let owned: Vec<_> = layout.owned.iter().map(|m| (m.assure)(self)).collect();
        let get: Vec<_> = layout.get.iter().map(|m| (m.assure)(self)).collect();
        let exclude: Vec<_> = layout.exclude.iter().map(|m| (m.assure)(self)).collect();

        let taken = &self.owned;
        let mut group = Group::new(layout, owned, get, exclude, &self.pools, |id| {
            taken.contains(id.index())
        })?;

        for &id in group.owned() {
            self.owned.grow(id.index() + 1);
            self.owned.insert(id.index());
        }
        for entity in group.candidates(&self.pools) {
            group.push_on_construct(&mut self.pools, entity);
        }

        debug!(
            "created group {} with {} matching entities",
            self.groups.len(),
            group.len()
        );
        self.groups.push(group);
        Ok(GroupId(self.groups.len() - 1))
    }

    /// Number of entities matching a group.
    pub fn group_len(&self, id: GroupId) -> usize {
        self.groups[id.0].len()
    }

    /// The entities matching a group, in group order. For owning groups this is the packed prefix
    /// shared by every owned storage.
    pub fn group_entities(&self, id: GroupId) -> &[Entity] {
        self.groups[id.0].entities(&self.pools)
    }

    pub fn group_contains(&self, id: GroupId, entity: Entity) -> bool {
        self.groups[id.0].contains(&self.pools, entity)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.in_use())
            .field("storages", &self.pools.iter().flatten().count())
            .field("groups", &self.groups.len())
            .finish()
    }
}
