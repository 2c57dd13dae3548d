//! Entity handles for the sparse set storage.
//!
//! An [`Entity`] is an opaque 32 bit handle split into two fields:
//!
//! ```text
//!  31          20 19                           0
//! ┌──────────────┬──────────────────────────────┐
//! │   version    │            index             │
//! │   12 bits    │           20 bits            │
//! └──────────────┴──────────────────────────────┘
//! ```
//!
//! - The **index** identifies a slot in every sparse index that maps entities to dense positions.
//! - The **version** (or generation) tracks how many times that index has been recycled, so a stale
//!   handle can be told apart from the current owner of the index.
//!
//! Two values are reserved and never denote a live entity:
//!
//! - [`Entity::NULL`] has an all-ones index. Any handle whose index field is all-ones is null.
//! - [`Entity::TOMBSTONE`] has an all-ones version. Any handle whose version field is all-ones is a
//!   tombstone. Tombstones mark deleted-but-still-allocated slots in in-place storages.
//!
//! All constructors mask their inputs into the valid bit ranges, so overflowing an index or a version
//! silently truncates. Bumping a version via [`Entity::next`] wraps around before it can reach the
//! tombstone version.
//!
//! # Example
//!
//! ```rust
//! use rusty_sparse::ecs::entity::Entity;
//!
//! let entity = Entity::construct(42, 0);
//! let recycled = entity.next();
//!
//! assert_eq!(recycled.index(), 42);
//! assert_eq!(recycled.version(), 1);
//! assert_ne!(entity, recycled);
//! ```

use std::fmt;

/// An entity identifier packing an index and a version into a single `u32`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(u32);

impl Entity {
    /// Mask of the index field.
    pub const ENTITY_MASK: u32 = 0xFFFFF;

    /// Mask of the version field, once shifted down.
    pub const VERSION_MASK: u32 = 0xFFF;

    /// Number of bits used by the index field.
    pub const ENTITY_SHIFT: u32 = 20;

    /// The null entity. Its index is all-ones.
    pub const NULL: Self = Self(u32::MAX);

    /// The tombstone entity. Its version is all-ones.
    pub const TOMBSTONE: Self = Self(u32::MAX);

    /// Construct an entity from an index and a version. Both are masked into range.
    #[inline]
    pub const fn construct(index: u32, version: u32) -> Self {
        Self((index & Self::ENTITY_MASK) | ((version & Self::VERSION_MASK) << Self::ENTITY_SHIFT))
    }

    /// Combine the index field of `lhs` with the version field of `rhs`.
    #[inline]
    pub const fn combine(lhs: Entity, rhs: Entity) -> Self {
        Self((lhs.0 & Self::ENTITY_MASK) | (rhs.0 & (Self::VERSION_MASK << Self::ENTITY_SHIFT)))
    }

    /// Reinterpret raw bits as an entity.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Get the raw bits of this entity.
    #[inline]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Get the index field.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0 & Self::ENTITY_MASK
    }

    /// Get the version field.
    #[inline]
    pub const fn version(self) -> u32 {
        self.0 >> Self::ENTITY_SHIFT
    }

    /// Get the index field widened for slice access.
    #[inline]
    pub const fn slot(self) -> usize {
        self.index() as usize
    }

    /// Get an entity with the same index and the following version.
    ///
    /// The version wraps before it reaches [`Entity::VERSION_MASK`], so the result is never a
    /// tombstone.
    #[inline]
    pub const fn next(self) -> Self {
        let version = self.version() + 1;
        Self::construct(self.index(), version + (version == Self::VERSION_MASK) as u32)
    }

    /// Returns `true` if the index field is the null index.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.index() == Self::ENTITY_MASK
    }

    /// Returns `true` if the version field is the tombstone version.
    #[inline]
    pub const fn is_tombstone(self) -> bool {
        self.version() == Self::VERSION_MASK
    }
}

impl Default for Entity {
    /// Defaults to [`Entity::NULL`].
    #[inline]
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Entity(null)")
        } else {
            write!(f, "Entity({}v{})", self.index(), self.version())
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.version())
    }
}

impl From<u32> for Entity {
    /// Build a first version entity from an index.
    #[inline]
    fn from(index: u32) -> Self {
        Self::construct(index, 0)
    }
}

#[test]
fn construct_and_split() {
    // Given
    let entity = Entity::construct(42, 7);

    // Then
    assert_eq!(entity.index(), 42);
    assert_eq!(entity.version(), 7);
    assert_eq!(entity.slot(), 42);
    assert_eq!(entity.to_bits(), 42 | (7 << Entity::ENTITY_SHIFT));
}

#[test]
fn construct_masks_overflow() {
    // When
    let entity = Entity::construct(Entity::ENTITY_MASK + 3, Entity::VERSION_MASK + 2);

    // Then - both fields truncate silently
    assert_eq!(entity.index(), 2);
    assert_eq!(entity.version(), 1);
}

#[test]
fn combine_takes_index_and_version() {
    // Given
    let lhs = Entity::construct(3, 9);
    let rhs = Entity::construct(11, 4);

    // When
    let combined = Entity::combine(lhs, rhs);

    // Then
    assert_eq!(combined.index(), 3);
    assert_eq!(combined.version(), 4);
}

#[test]
fn next_skips_tombstone_version() {
    // Given
    let last = Entity::construct(5, Entity::VERSION_MASK - 1);

    // When
    let wrapped = last.next();

    // Then
    assert_eq!(wrapped.index(), 5);
    assert_eq!(wrapped.version(), 0);
    assert!(!wrapped.is_tombstone());
    assert_eq!(Entity::construct(5, 0).next().version(), 1);
}

#[test]
fn sentinels() {
    // Then
    assert!(Entity::NULL.is_null());
    assert!(Entity::TOMBSTONE.is_tombstone());
    assert!(Entity::construct(Entity::ENTITY_MASK, 3).is_null());
    assert!(Entity::construct(3, Entity::VERSION_MASK).is_tombstone());
    assert!(!Entity::construct(0, 0).is_null());
    assert!(!Entity::construct(0, 0).is_tombstone());
    assert_eq!(Entity::default(), Entity::NULL);
}

#[test]
fn formatting() {
    // Then
    assert_eq!(format!("{}", Entity::construct(4, 2)), "4v2");
    assert_eq!(format!("{:?}", Entity::construct(4, 2)), "Entity(4v2)");
    assert_eq!(format!("{:?}", Entity::NULL), "Entity(null)");
}
