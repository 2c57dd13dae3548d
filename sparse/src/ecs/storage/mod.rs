//! Sparse set storage for entities and their components.
//!
//! Every component type gets its own storage. A storage is a [`SparseSet`] (entity index → slot)
//! plus, for sized components, a payload column aligned slot for slot with the set's packed array.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  World                                                       │
//! │  - EntityStorage (identifier pool)                           │
//! │  - one Box<dyn AnyStorage> per component type                │
//! └──────────────┬───────────────────────────────┬───────────────┘
//!                │                               │
//! ┌──────────────▼──────────────┐  ┌─────────────▼──────────────┐
//! │  EntityStorage              │  │  Storage<T>                │
//! │  - swap-only SparseSet      │  │  - SparseSet (T's policy)  │
//! │  - in_use boundary          │  │  - Column<T> payload pages │
//! └──────────────┬──────────────┘  └─────────────┬──────────────┘
//!                │                               │
//!          ┌─────▼───────────────────────────────▼─────┐
//!          │  SparseSet                                │
//!          │  - SparseIndex (paged)                    │
//!          │  - packed Vec<Entity>                     │
//!          │  - DeletionPolicy state machine           │
//!          └───────────────────────────────────────────┘
//! ```
//!
//! # Slot Moves
//!
//! The set decides where entities live; the payload follows. Any slot move the set performs
//! (swap-and-pop, compaction, sorting, `sort_as`, `swap_elements`) is reported through the
//! [`Relocate`] capability so the payload column performs the exact same move.
//!
//! # Deletion Policies
//!
//! | Policy | Erase | Used by |
//! |--------|-------|---------|
//! | [`DeletionPolicy::SwapAndPop`] | last slot moves into the hole | components (default) |
//! | [`DeletionPolicy::InPlace`] | tombstone, slot reused later | `IN_PLACE_DELETE` / `PINNED` components |
//! | [`DeletionPolicy::SwapOnly`] | swap to the live boundary, bump version | [`EntityStorage`] |
//!
//! # Failure Model
//!
//! Allocation failures are returned as [`Error`] by the `try_*` operations, which leave the storage
//! as it was. Their infallible counterparts panic. Contract violations are checked with debug
//! assertions.

mod column;
mod entities;
mod erased;
pub mod error;
pub mod index;
pub mod sparse_set;
mod typed;

pub use column::Column;
pub use entities::EntityStorage;
pub use erased::AnyStorage;
pub use error::Error;
pub use index::SparseIndex;
pub use sparse_set::{DeletionPolicy, Relocate, SparseSet};
pub use typed::Storage;
