use std::any::{Any, TypeId};

use crate::ecs::{
    component::Component,
    entity::Entity,
    storage::{
        sparse_set::{DeletionPolicy, SparseSet},
        typed::Storage,
    },
};

/// A typed storage seen through its sparse set.
///
/// The world keeps one boxed `AnyStorage` per component type and only recovers the concrete
/// [`Storage<T>`] when the caller names `T`. Everything that does not touch a payload value
/// (membership, erasure, reordering) goes through this trait.
pub trait AnyStorage: Any {
    /// The underlying sparse set.
    fn set(&self) -> &SparseSet;

    /// The Rust type id of the component held.
    fn component_type(&self) -> TypeId;

    fn type_name(&self) -> &'static str;

    fn policy(&self) -> DeletionPolicy {
        self.set().policy()
    }

    fn contains(&self, entity: Entity) -> bool {
        self.set().contains(entity)
    }

    fn len(&self) -> usize {
        self.set().len()
    }

    fn is_empty(&self) -> bool {
        self.set().is_empty()
    }

    /// Erase `entity` and drop its value. The entity must be present.
    fn erase(&mut self, entity: Entity);

    /// Erase `entity` if present.
    fn remove(&mut self, entity: Entity) -> bool;

    fn swap_elements(&mut self, lhs: Entity, rhs: Entity);

    fn clear(&mut self);

    fn compact(&mut self);

    /// See [`SparseSet::sort_as`].
    fn sort_as(&mut self, other: &SparseSet);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyStorage for Storage<T> {
    #[inline]
    fn set(&self) -> &SparseSet {
        self.base()
    }

    #[inline]
    fn component_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    #[inline]
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn erase(&mut self, entity: Entity) {
        Storage::erase(self, entity);
    }

    fn remove(&mut self, entity: Entity) -> bool {
        Storage::remove(self, entity)
    }

    fn swap_elements(&mut self, lhs: Entity, rhs: Entity) {
        Storage::swap_elements(self, lhs, rhs);
    }

    fn clear(&mut self) {
        Storage::clear(self);
    }

    fn compact(&mut self) {
        Storage::compact(self);
    }

    fn sort_as(&mut self, other: &SparseSet) {
        Storage::sort_as(self, other);
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<'a> dyn AnyStorage + 'a {
    /// Recover the concrete storage, if it holds `T`.
    #[inline]
    pub fn downcast_ref<T: Component>(&self) -> Option<&Storage<T>> {
        self.as_any().downcast_ref::<Storage<T>>()
    }

    #[inline]
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut Storage<T>> {
        self.as_any_mut().downcast_mut::<Storage<T>>()
    }
}
