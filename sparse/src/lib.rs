//! Sparse set entity storage: entity handles, paged sparse sets with selectable deletion
//! policies, typed component storages, lifecycle signals, groups and a world tying them together.

// Lets `#[derive(Component)]` name `::rusty_sparse` from inside this crate too.
extern crate self as rusty_sparse;

pub mod ecs;
