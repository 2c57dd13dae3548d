//! Component types and their identity.
//!
//! Components are the payloads attached to entities. Each component type gets its own
//! [`Storage`](crate::ecs::storage::Storage) and is identified at runtime by a dense [`Id`] handed
//! out by a [`Registry`].
//!
//! ## Per-type configuration
//!
//! The [`Component`] trait carries a few associated consts that select how a storage behaves for
//! that type:
//!
//! | Const | Default | Effect |
//! |-------|---------|--------|
//! | `PAGE_SIZE` | 1024 (0 for zero-sized types) | Number of payload values per page |
//! | `PINNED` | `false` | Values are never relocated once emplaced |
//! | `IN_PLACE_DELETE` | `PINNED` | Erase leaves a tombstone instead of swapping the last value in |
//!
//! A pinned type must use in-place deletion; storages reject the combination at compile time.
//!
//! ## Usage
//!
//! ```ignore
//! use rusty_sparse::ecs::component::{Component, Registry};
//!
//! #[derive(Component)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Component)]
//! #[component(pinned)]
//! struct Node { parent: Option<std::ptr::NonNull<Node>> }
//!
//! let registry = Registry::new();
//! let pos_id = registry.register::<Position>();
//! ```

mod registry;

use std::{alloc::Layout, any::TypeId};

pub use registry::Registry;
pub use rusty_sparse_macros::Component;

use crate::ecs::storage::DeletionPolicy;

/// A component identifier. Dense, starting at zero, assigned in registration order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Construct a new component Id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this component if it were to live in indexable storage (e.g. Vec)
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Id {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<usize> for Id {
    #[inline]
    fn from(value: usize) -> Self {
        Self::new(value as u32)
    }
}

/// A trait representing a component: any `'static` value that can be attached to an entity.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Component)]
/// #[component(in_place, page_size = 256)]
/// struct Health(u32);
/// ```
pub trait Component: 'static + Sized {
    /// Values are never moved by their storage once emplaced. Implies in-place deletion.
    const PINNED: bool = false;

    /// Erase leaves a tombstone so surviving values keep their slot.
    const IN_PLACE_DELETE: bool = Self::PINNED;

    /// Number of values per payload page. Must be a power of two, except for zero-sized types
    /// which have no payload pages at all.
    const PAGE_SIZE: usize = if std::mem::size_of::<Self>() == 0 {
        0
    } else {
        1024
    };

    /// The deletion policy of this component's storage.
    #[inline]
    fn policy() -> DeletionPolicy {
        if Self::IN_PLACE_DELETE {
            DeletionPolicy::InPlace
        } else {
            DeletionPolicy::SwapAndPop
        }
    }
}

/// Metadata about a registered component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Info {
    id: Id,
    type_id: TypeId,
    name: &'static str,
    layout: Layout,
    policy: DeletionPolicy,
    pinned: bool,
}

impl Info {
    /// Construct the info for component `C` under the given id.
    pub fn new<C: Component>(id: Id) -> Self {
        Self {
            id,
            type_id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
            layout: Layout::new::<C>(),
            policy: C::policy(),
            pinned: C::PINNED,
        }
    }

    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the Rust TypeId.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    #[inline]
    pub fn policy(&self) -> DeletionPolicy {
        self.policy
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Check if this is a zero-sized ("tag") component.
    #[inline]
    pub fn is_zero_sized(&self) -> bool {
        self.layout.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_consts() {
        // Given
        #[derive(Component)]
        struct Position(f32, f32);

        #[derive(Component)]
        struct Tag;

        // Then
        assert_eq!(Position::PAGE_SIZE, 1024);
        assert!(!Position::PINNED);
        assert_eq!(Position::policy(), DeletionPolicy::SwapAndPop);
        assert_eq!(Tag::PAGE_SIZE, 0);
    }

    #[test]
    fn derive_attributes() {
        // Given
        #[derive(Component)]
        #[component(pinned, page_size = 16)]
        struct Node(u64);

        #[derive(Component)]
        #[component(in_place)]
        struct Health(u32);

        // Then
        assert!(Node::PINNED);
        assert!(Node::IN_PLACE_DELETE);
        assert_eq!(Node::PAGE_SIZE, 16);
        assert_eq!(Node::policy(), DeletionPolicy::InPlace);
        assert!(!Health::PINNED);
        assert_eq!(Health::policy(), DeletionPolicy::InPlace);
    }

    #[test]
    fn info_describes_type() {
        // Given
        #[derive(Component)]
        #[component(pinned)]
        struct Node(u64);

        // When
        let info = Info::new::<Node>(Id::new(3));

        // Then
        assert_eq!(info.id().index(), 3);
        assert_eq!(info.type_id(), TypeId::of::<Node>());
        assert!(info.name().ends_with("Node"));
        assert_eq!(info.layout(), Layout::new::<u64>());
        assert_eq!(info.policy(), DeletionPolicy::InPlace);
        assert!(info.is_pinned());
        assert!(!info.is_zero_sized());
    }
}
