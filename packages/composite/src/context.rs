//! Routing across the stores of a composite tree.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use mosaic_node_store::{
    accumulate_child_sizes, Blob, BlobStore, ChildCount, Name, Path, UNBOUNDED_CHILD_COUNT,
};

use crate::{MountInfoProvider, MountedNodeStore};

/// Decides which backing store serves which part of the tree.
///
/// The context holds one [`MountedNodeStore`] per mount: the global store
/// (index 0) for the default mount, followed by the named mounts in
/// registration order. Blobs are always created in the global store.
pub struct CompositionContext {
    mip: MountInfoProvider,
    stores: Vec<MountedNodeStore>,
    blobs: Arc<dyn BlobStore>,
}

impl CompositionContext {
    pub fn new(mip: MountInfoProvider, blobs: Arc<dyn BlobStore>) -> Self {
        let mut stores = vec![MountedNodeStore::new(0, mip.default_mount().clone())];
        stores.extend(
            mip.non_default_mounts()
                .iter()
                .enumerate()
                .map(|(i, mount)| MountedNodeStore::new(i + 1, mount.clone())),
        );
        Self { mip, stores, blobs }
    }

    /// All stores, global first.
    pub fn all_stores(&self) -> &[MountedNodeStore] {
        &self.stores
    }

    pub fn global_store(&self) -> &MountedNodeStore {
        &self.stores[0]
    }

    pub fn non_default_stores(&self) -> &[MountedNodeStore] {
        &self.stores[1..]
    }

    /// The store of the named mount.
    pub fn store_by_name(&self, name: &str) -> Option<&MountedNodeStore> {
        self.stores.iter().find(|s| s.mount().name() == name)
    }

    /// The single store owning the node at `path`.
    pub fn owning_store(&self, path: &Path) -> &MountedNodeStore {
        let mount = self.mip.mount_by_path(path);
        if mount.is_default() {
            return self.global_store();
        }
        self.store_by_name(mount.name())
            .unwrap_or_else(|| self.global_store())
    }

    /// Whether children of `path` may come from more than one store.
    pub fn should_be_composite(&self, path: &Path) -> bool {
        if !self.mip.has_non_default_mounts() || !self.mip.mount_by_path(path).is_default() {
            return false;
        }
        !self.mip.mounts_placed_under(path).is_empty()
            || self
                .mip
                .non_default_mounts()
                .iter()
                .any(|m| m.supports_fragment_under(path) || m.supports_fragment(path))
    }

    /// The stores that may hold children of `path`, in store order.
    ///
    /// `children_of` lists a store's child names at `path`; it is consulted
    /// only for mounts supporting fragments at `path`.
    pub fn contributing_stores<F>(&self, path: &Path, children_of: F) -> Vec<MountedNodeStore>
    where
        F: Fn(&MountedNodeStore) -> Vec<Name>,
    {
        let owner = self.owning_store(path);
        if !owner.is_global() {
            return vec![owner.clone()];
        }

        let directly_under = self.mip.mounts_placed_directly_under(path);
        let mut result = vec![owner.clone()];
        for store in self.non_default_stores() {
            let mount = store.mount();
            if directly_under.iter().any(|m| m.name() == mount.name())
                || (mount.supports_fragment(path)
                    && children_of(store).iter().any(|n| mount.is_fragment_name(n)))
            {
                result.push(store.clone());
            }
        }
        result
    }

    /// Whether child `name` of `parent` is served by `store`.
    ///
    /// Filtering child names with this keeps every name unique across the
    /// contributing stores of `parent`.
    pub fn belongs_to_store(&self, store: &MountedNodeStore, parent: &Path, name: &Name) -> bool {
        self.owning_store(&parent.child(name)) == store
    }

    /// Child names of `path` across `contributing` stores.
    pub fn child_node_names<N>(
        &self,
        path: &Path,
        contributing: &[MountedNodeStore],
        names_of: N,
    ) -> Vec<Name>
    where
        N: Fn(&MountedNodeStore) -> Vec<Name>,
    {
        contributing
            .iter()
            .flat_map(|store| {
                names_of(store)
                    .into_iter()
                    .filter(move |name| self.belongs_to_store(store, path, name))
            })
            .collect()
    }

    /// Child count of `path` across `contributing` stores.
    ///
    /// A single contributor is asked directly. Otherwise each store's own
    /// count is checked first: an unbounded count makes the total unbounded
    /// without listing that store's children. Counting stops once `max` is
    /// reached.
    pub fn child_node_count<C, N>(
        &self,
        path: &Path,
        contributing: &[MountedNodeStore],
        count_of: C,
        names_of: N,
        max: u64,
    ) -> u64
    where
        C: Fn(&MountedNodeStore, u64) -> u64,
        N: Fn(&MountedNodeStore) -> Vec<Name>,
    {
        match contributing {
            [] => 0,
            [single] => count_of(single, max),
            stores => {
                let items = stores.iter().flat_map(|store| -> Vec<ChildCount> {
                    if count_of(store, max) == UNBOUNDED_CHILD_COUNT {
                        return vec![ChildCount::Unbounded];
                    }
                    names_of(store)
                        .into_iter()
                        .filter(|name| self.belongs_to_store(store, path, name))
                        .map(ChildCount::Child)
                        .collect()
                });
                accumulate_child_sizes(items, max)
            }
        }
    }

    /// Create a blob in the global store.
    pub fn create_blob(&self, reader: &mut dyn Read) -> Result<Blob, mosaic_node_store::Error> {
        self.blobs.create_blob(reader)
    }
}

impl fmt::Debug for CompositionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositionContext")
            .field(
                "stores",
                &self.stores.iter().map(|s| s.mount().name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
