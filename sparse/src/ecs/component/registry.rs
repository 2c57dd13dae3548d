use std::{
    any::TypeId,
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicU32, Ordering},
    },
};

use dashmap::DashMap;
use log::debug;

use crate::ecs::component::{Component, Id, Info};

/// A thread-safe component registry, the type identity source for storages.
///
/// The registry uses lock-free reads for TypeId→Id lookups via `DashMap`, making the common read
/// path cheap. Registration only locks a single shard of the DashMap and the info vector.
///
/// Why thread-safe?
/// - Worlds are single-writer, but several worlds may live on different threads and want to agree
///   on component ids by sharing one registry.
pub struct Registry {
    /// Map from TypeId to component Id. Lock-free reads via sharded concurrent hashmap.
    type_map: DashMap<TypeId, Id>,

    /// List of registered component entries. Protected by RwLock for rare writes.
    components: RwLock<Vec<Option<Info>>>,

    /// Next available component identifier.
    next_id: AtomicU32,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a new component registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            type_map: DashMap::new(),
            components: RwLock::new(Vec::new()),
            next_id: AtomicU32::new(0),
        }
    }

    /// Register a component type and get its identifier.
    ///
    /// Idempotent and safe to call concurrently: registering a known type returns its existing id.
    pub fn register<C: Component>(&self) -> Id {
        let type_id = TypeId::of::<C>();

        // Fast path: check if already registered (lock-free read)
        if let Some(id) = self.type_map.get(&type_id) {
            return *id;
        }

        // Entry API so two threads missing the fast path agree on one id
        *self
            .type_map
            .entry(type_id)
            .or_insert_with(|| {
                let id = Id::new(self.next_id.fetch_add(1, Ordering::Relaxed));
                let info = Info::new::<C>(id);

                let mut components = self
                    .components
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                if id.index() >= components.len() {
                    components.resize(id.index() + 1, None);
                }
                components[id.index()] = Some(info);

                debug!("registered component {} as {:?}", info.name(), id);
                id
            })
            .value()
    }

    /// Get the id of component `C`, if registered.
    #[inline]
    pub fn get<C: Component>(&self) -> Option<Id> {
        self.type_map
            .get(&TypeId::of::<C>())
            .map(|entry| *entry.value())
    }

    /// Get the info of component `C`, if registered.
    #[inline]
    pub fn get_info<C: Component>(&self) -> Option<Info> {
        let id = self.get::<C>()?;
        self.get_info_by_id(id)
    }

    /// Get component info by id.
    #[inline]
    pub fn get_info_by_id(&self, id: Id) -> Option<Info> {
        let components = self
            .components
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        components.get(id.index()).and_then(|info| *info)
    }

    /// Number of registered components.
    #[inline]
    pub fn len(&self) -> usize {
        self.type_map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.type_map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;
    use crate::ecs::storage::DeletionPolicy;

    #[derive(Component)]
    struct Position(f32);

    #[derive(Component)]
    #[component(in_place)]
    struct Health(u32);

    #[derive(Component)]
    #[component(pinned)]
    struct Node(u64);

    #[derive(Component)]
    struct Marker;

    #[test]
    fn ids_are_dense_in_registration_order() {
        // Given
        let registry = Registry::new();

        // When
        let ids = [
            registry.register::<Health>(),
            registry.register::<Position>(),
            registry.register::<Health>(),
            registry.register::<Marker>(),
        ];

        // Then
        assert_eq!(ids.map(|id| id.index()), [0, 1, 0, 2]);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get::<Position>(), Some(ids[1]));
        assert!(registry.get::<Node>().is_none());
        assert!(registry.get_info::<Node>().is_none());
        assert!(registry.get_info_by_id(Id::new(3)).is_none());
    }

    #[test]
    fn info_records_storage_configuration() {
        // Given
        let registry = Registry::new();
        let health = registry.register::<Health>();
        registry.register::<Node>();
        registry.register::<Marker>();

        // When
        let infos: Vec<_> = (0..3)
            .map(|index| registry.get_info_by_id(Id::new(index)).unwrap())
            .collect();

        // Then
        assert_eq!(infos[0].id(), health);
        assert_eq!(infos[0].type_id(), TypeId::of::<Health>());
        assert_eq!(infos[0].policy(), DeletionPolicy::InPlace);
        assert!(!infos[0].is_pinned());
        assert!(infos[1].is_pinned());
        assert_eq!(infos[1].policy(), DeletionPolicy::InPlace);
        assert!(infos[2].is_zero_sized());
        assert_eq!(infos[2].policy(), DeletionPolicy::SwapAndPop);
        assert_eq!(registry.get_info::<Node>(), Some(infos[1]));
    }

    #[test]
    fn threads_sharing_a_registry_agree_on_ids() {
        // Given
        let registry = Arc::new(Registry::new());

        // When - racing registrations of the same three types
        let handles: Vec<_> = (0..12)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || match i % 3 {
                    0 => (0, registry.register::<Position>()),
                    1 => (1, registry.register::<Health>()),
                    _ => (2, registry.register::<Marker>()),
                })
            })
            .collect();
        let mut seen = [None; 3];
        for handle in handles {
            let (kind, id) = handle.join().unwrap();
            // Then - every thread got the id the first one did
            assert_eq!(*seen[kind].get_or_insert(id), id);
        }

        // Then
        let mut ids: Vec<_> = seen.iter().map(|id| id.unwrap().index()).collect();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(registry.len(), 3);
    }
}
