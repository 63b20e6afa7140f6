//! Per-store maps.
//!
//! A [`NodeMap`] holds one value per backing store: a builder, a snapshot,
//! or anything else derived from them. Maps are immutable; every transform
//! produces a new map. Lazily transformed values are computed on first
//! access and memoized, so stores a caller never visits are never touched.

use std::fmt;
use std::ops::Index;
use std::sync::{Arc, OnceLock};

use crate::MountedNodeStore;

type Init<T> = Box<dyn Fn() -> T + Send + Sync>;

enum Slot<T> {
    Ready(T),
    Deferred { cell: OnceLock<T>, init: Init<T> },
}

impl<T> Slot<T> {
    fn get(&self) -> &T {
        match self {
            Slot::Ready(value) => value,
            Slot::Deferred { cell, init } => cell.get_or_init(|| init()),
        }
    }

    fn is_evaluated(&self) -> bool {
        match self {
            Slot::Ready(_) => true,
            Slot::Deferred { cell, .. } => cell.get().is_some(),
        }
    }
}

/// An immutable map from store handle to a per-store value.
///
/// Cloning shares the values. Entries are kept in store order.
pub struct NodeMap<T> {
    entries: Vec<(MountedNodeStore, Arc<Slot<T>>)>,
}

impl<T> Clone for NodeMap<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> NodeMap<T> {
    /// Build a map from already computed values.
    pub fn from_entries(entries: impl IntoIterator<Item = (MountedNodeStore, T)>) -> Self {
        let mut entries: Vec<_> = entries
            .into_iter()
            .map(|(store, value)| (store, Arc::new(Slot::Ready(value))))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self { entries }
    }

    fn slot(&self, store: &MountedNodeStore) -> Option<&Arc<Slot<T>>> {
        self.entries
            .binary_search_by(|(s, _)| s.cmp(store))
            .ok()
            .map(|i| &self.entries[i].1)
    }

    /// The value for `store`, computing it if it was deferred.
    pub fn get(&self, store: &MountedNodeStore) -> Option<&T> {
        self.slot(store).map(|slot| slot.get())
    }

    /// Whether the value for `store` has been computed yet.
    pub fn is_evaluated(&self, store: &MountedNodeStore) -> bool {
        self.slot(store).is_some_and(|slot| slot.is_evaluated())
    }

    pub fn stores(&self) -> impl Iterator<Item = &MountedNodeStore> {
        self.entries.iter().map(|(store, _)| store)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Transform every value now.
    pub fn map_eager<R>(&self, f: impl Fn(&MountedNodeStore, &T) -> R) -> NodeMap<R> {
        NodeMap {
            entries: self
                .entries
                .iter()
                .map(|(store, slot)| (store.clone(), Arc::new(Slot::Ready(f(store, slot.get())))))
                .collect(),
        }
    }

    /// Transform every value on first access.
    pub fn map_lazy<R, F>(&self, f: F) -> NodeMap<R>
    where
        T: Send + Sync + 'static,
        R: 'static,
        F: Fn(&MountedNodeStore, &T) -> R + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        NodeMap {
            entries: self
                .entries
                .iter()
                .map(|(store, slot)| {
                    let f = f.clone();
                    let source = slot.clone();
                    let key = store.clone();
                    let init: Init<R> = Box::new(move || f(&key, source.get()));
                    let deferred = Slot::Deferred {
                        cell: OnceLock::new(),
                        init,
                    };
                    (store.clone(), Arc::new(deferred))
                })
                .collect(),
        }
    }

    /// A copy of this map with the value for `store` replaced.
    ///
    /// All other entries are shared with this map. A store that is not part
    /// of the map is added.
    #[must_use]
    pub fn with_replaced(&self, store: &MountedNodeStore, value: T) -> Self {
        let mut entries = self.entries.clone();
        let slot = Arc::new(Slot::Ready(value));
        match entries.binary_search_by(|(s, _)| s.cmp(store)) {
            Ok(i) => entries[i].1 = slot,
            Err(i) => entries.insert(i, (store.clone(), slot)),
        }
        Self { entries }
    }
}

impl<T> Index<&MountedNodeStore> for NodeMap<T> {
    type Output = T;

    /// # Panics
    ///
    /// If `store` is not part of the map. Maps built by a composite store
    /// always cover every store of its context.
    fn index(&self, store: &MountedNodeStore) -> &T {
        match self.get(store) {
            Some(value) => value,
            None => panic!("store {} is not part of the map", store.mount().name()),
        }
    }
}

impl<T> fmt::Debug for NodeMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(store, slot)| {
                let state = if slot.is_evaluated() { "ready" } else { "deferred" };
                (store.mount().name(), state)
            }))
            .finish()
    }
}
