//! Groups: incrementally maintained views over the entities that have a given set of components.
//!
//! A group is described by a [`GroupLayout`] with three roles:
//!
//! | Role | Meaning |
//! |------|---------|
//! | owned | must be present; the group reorders these storages |
//! | get | must be present; observed only |
//! | exclude | must be absent |
//!
//! # Owning groups
//!
//! When a layout owns at least one component, the group keeps a length `len` and maintains the
//! invariant that the first `len` slots of every owned storage hold exactly the matching entities,
//! in the same order across all owned storages. Iterating a group is then a plain walk over a
//! prefix of the packed arrays, no lookups needed.
//!
//! ```text
//!   owned A:  [ e4 | e1 | e9 ‖ e2 | e7 ]
//!   owned B:  [ e4 | e1 | e9 ‖ e3 ]
//!                           ▲
//!                        len = 3
//! ```
//!
//! A component can be owned by a single group, and in-place storages cannot be owned since
//! their tombstones would break the packed prefix.
//!
//! # Non-owning groups
//!
//! Without owned components the group keeps its own [`SparseSet`] of matching entities.
//!
//! # Maintenance
//!
//! The world routes every emplace and erase of a grouped component through the group:
//!
//! | Event | owned / get component | excluded component |
//! |-------|-----------------------|--------------------|
//! | emplaced | [`Group::push_on_construct`] | [`Group::remove_if`] |
//! | about to be erased | [`Group::remove_if`] | [`Group::push_on_destroy`] |

use std::any::TypeId;

use thiserror::Error;

use crate::ecs::{
    component::{self, Component},
    entity::Entity,
    storage::{AnyStorage, DeletionPolicy, SparseSet},
    world::World,
};

/// The storages of a world, indexed by component id.
pub(crate) type Pools = [Option<Box<dyn AnyStorage>>];

/// Identifier of a group within its world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub(crate) usize);

impl GroupId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Reasons a group cannot be created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("component {component} is already owned by another group")]
    OwnershipConflict { component: &'static str },

    #[error("component {component} uses in-place deletion and cannot be owned")]
    InPlaceOwned { component: &'static str },

    #[error("component {component} appears more than once in the group layout")]
    Overlap { component: &'static str },

    #[error("a group needs at least one owned or observed component")]
    Empty,
}

/// A component named by a layout, with the means to create its storage in a world.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Member {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) assure: fn(&mut World) -> component::Id,
}

impl Member {
    fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            assure: World::assure::<T>,
        }
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

/// Describes which components a group owns, observes and excludes.
///
/// ```rust,ignore
/// let layout = GroupLayout::new()
///     .owned::<Position>()
///     .owned::<Velocity>()
///     .get::<Mass>()
///     .exclude::<Frozen>();
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupLayout {
    pub(crate) owned: Vec<Member>,
    pub(crate) get: Vec<Member>,
    pub(crate) exclude: Vec<Member>,
}

impl GroupLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Own `T`: its storage is reordered so that matching entities come first.
    pub fn owned<T: Component>(mut self) -> Self {
        self.owned.push(Member::of::<T>());
        self
    }

    /// Require `T` without reordering its storage.
    pub fn get<T: Component>(mut self) -> Self {
        self.get.push(Member::of::<T>());
        self
    }

    /// Require the absence of `T`.
    pub fn exclude<T: Component>(mut self) -> Self {
        self.exclude.push(Member::of::<T>());
        self
    }

    pub(crate) fn members(&self) -> impl Iterator<Item = &Member> {
        self.owned.iter().chain(&self.get).chain(&self.exclude)
    }

    pub(crate) fn is_owning(&self) -> bool {
        !self.owned.is_empty()
    }
}

#[derive(Debug)]
enum Matches {
    /// Matching entities are the first `len` slots of every owned storage.
    Owning { len: usize },

    /// Matching entities are kept in a private set.
    Filtered(SparseSet),
}

/// A group over storages resolved to component ids.
#[derive(Debug)]
pub(crate) struct Group {
    layout: GroupLayout,
    owned: Vec<component::Id>,
    get: Vec<component::Id>,
    exclude: Vec<component::Id>,
    matches: Matches,
}

#[inline]
fn pool(pools: &Pools, id: component::Id) -> &dyn AnyStorage {
    match pools.get(id.index()).and_then(Option::as_deref) {
        Some(storage) => storage,
        None => panic!("no storage for component {id:?}"),
    }
}

#[inline]
fn pool_mut(pools: &mut Pools, id: component::Id) -> &mut dyn AnyStorage {
    match pools.get_mut(id.index()).and_then(Option::as_deref_mut) {
        Some(storage) => storage,
        None => panic!("no storage for component {id:?}"),
    }
}

impl Group {
    /// Resolve a layout against the storages of a world and check it can be honoured.
    ///
    /// `owned_elsewhere` reports whether a component is already owned by another group.
    pub(crate) fn new(
        layout: GroupLayout,
        owned: Vec<component::Id>,
        get: Vec<component::Id>,
        exclude: Vec<component::Id>,
        pools: &Pools,
        owned_elsewhere: impl Fn(component::Id) -> bool,
    ) -> Result<Self, GroupError> {
        if owned.is_empty() && get.is_empty() {
            return Err(GroupError::Empty);
        }

        let ids: Vec<_> = owned.iter().chain(&get).chain(&exclude).copied().collect();
        for (member, (pos, id)) in layout.members().zip(ids.iter().enumerate()) {
            if ids[..pos].contains(id) {
                return Err(GroupError::Overlap {
                    component: member.name,
                });
            }
        }

        for (member, &id) in layout.owned.iter().zip(&owned) {
            if owned_elsewhere(id) {
                return Err(GroupError::OwnershipConflict {
                    component: member.name,
                });
            }
            if pool(pools, id).policy() == DeletionPolicy::InPlace {
                return Err(GroupError::InPlaceOwned {
                    component: member.name,
                });
            }
        }

        let matches = if owned.is_empty() {
            Matches::Filtered(SparseSet::new(DeletionPolicy::SwapAndPop))
        } else {
            Matches::Owning { len: 0 }
        };

        Ok(Self {
            layout,
            owned,
            get,
            exclude,
            matches,
        })
    }

    #[inline]
    pub(crate) fn layout(&self) -> &GroupLayout {
        &self.layout
    }

    #[inline]
    pub(crate) fn owned(&self) -> &[component::Id] {
        &self.owned
    }

    /// Number of matching entities.
    pub(crate) fn len(&self) -> usize {
        match &self.matches {
            Matches::Owning { len } => *len,
            Matches::Filtered(set) => set.len(),
        }
    }

    /// The matching entities, in group order.
    pub(crate) fn entities<'a>(&'a self, pools: &'a Pools) -> &'a [Entity] {
        match &self.matches {
            Matches::Owning { len } => &pool(pools, self.owned[0]).set().data()[..*len],
            Matches::Filtered(set) => set.data(),
        }
    }

    pub(crate) fn contains(&self, pools: &Pools, entity: Entity) -> bool {
        match &self.matches {
            Matches::Owning { len } => pool(pools, self.owned[0])
                .set()
                .find(entity)
                .is_some_and(|pos| pos < *len),
            Matches::Filtered(set) => set.contains(entity),
        }
    }

    /// The entities worth testing when the group is created: those of its first required storage.
    pub(crate) fn candidates(&self, pools: &Pools) -> Vec<Entity> {
        let first = self.owned.first().or(self.get.first()).copied();
        first.map_or_else(Vec::new, |id| {
            pool(pools, id)
                .set()
                .iter()
                .filter(|entity| !entity.is_tombstone())
                .collect()
        })
    }

    #[inline]
    fn required(&self) -> impl Iterator<Item = component::Id> + '_ {
        self.owned.iter().chain(&self.get).copied()
    }

    /// Returns `true` if `id` is owned or observed by this group.
    #[inline]
    pub(crate) fn requires(&self, id: component::Id) -> bool {
        self.required().any(|required| required == id)
    }

    /// Returns `true` if `id` is excluded by this group.
    #[inline]
    pub(crate) fn excludes(&self, id: component::Id) -> bool {
        self.exclude.contains(&id)
    }

    fn has_required(&self, pools: &Pools, entity: Entity) -> bool {
        self.required().all(|id| pool(pools, id).contains(entity))
    }

    fn excluded_count(&self, pools: &Pools, entity: Entity) -> usize {
        self.exclude
            .iter()
            .filter(|&&id| pool(pools, id).contains(entity))
            .count()
    }

    /// Move `entity` into the matching prefix or set, unless it is already there.
    fn admit(&mut self, pools: &mut Pools, entity: Entity) {
        match &mut self.matches {
            Matches::Owning { len } => {
                if pool(pools, self.owned[0]).set().index(entity) < *len {
                    return;
                }
                for &id in &self.owned {
                    let storage = pool_mut(pools, id);
                    let at = storage.set().at(*len);
                    storage.swap_elements(at, entity);
                }
                *len += 1;
            }
            Matches::Filtered(set) => {
                if !set.contains(entity) {
                    set.push(entity);
                }
            }
        }
    }

    /// A required component was emplaced or an excluded one erased earlier: admit `entity` if it
    /// now matches.
    pub(crate) fn push_on_construct(&mut self, pools: &mut Pools, entity: Entity) {
        if self.has_required(pools, entity) && self.excluded_count(pools, entity) == 0 {
            self.admit(pools, entity);
        }
    }

    /// An excluded component is about to be erased: admit `entity` if that component is the only
    /// thing keeping it out.
    pub(crate) fn push_on_destroy(&mut self, pools: &mut Pools, entity: Entity) {
        if self.has_required(pools, entity) && self.excluded_count(pools, entity) == 1 {
            self.admit(pools, entity);
        }
    }

    /// Drop `entity` from the group if it is a member.
    pub(crate) fn remove_if(&mut self, pools: &mut Pools, entity: Entity) {
        match &mut self.matches {
            Matches::Owning { len } => {
                let in_prefix = pool(pools, self.owned[0])
                    .set()
                    .find(entity)
                    .is_some_and(|pos| pos < *len);
                if !in_prefix {
                    return;
                }
                *len -= 1;
                for &id in &self.owned {
                    let storage = pool_mut(pools, id);
                    let at = storage.set().at(*len);
                    storage.swap_elements(at, entity);
                }
            }
            Matches::Filtered(set) => {
                set.remove(entity);
            }
        }
    }

    /// Route an emplace of component `id`.
    pub(crate) fn on_construct(&mut self, id: component::Id, pools: &mut Pools, entity: Entity) {
        if self.requires(id) {
            self.push_on_construct(pools, entity);
        } else if self.excludes(id) {
            self.remove_if(pools, entity);
        }
    }

    /// Route an imminent erase of component `id`.
    pub(crate) fn on_destroy(&mut self, id: component::Id, pools: &mut Pools, entity: Entity) {
        if self.requires(id) {
            self.remove_if(pools, entity);
        } else if self.excludes(id) {
            self.push_on_destroy(pools, entity);
        }
    }
}
