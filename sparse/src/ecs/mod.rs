pub mod component;
pub mod entity;
pub mod group;
pub mod signal;
pub mod storage;
pub mod world;

pub use component::Component;
pub use entity::Entity;
pub use group::{GroupError, GroupId, GroupLayout};
pub use signal::{Connection, Lifecycle};
pub use storage::{DeletionPolicy, SparseSet, Storage};
pub use world::World;
