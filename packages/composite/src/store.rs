//! A node store assembled from mounted stores.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use log::debug;
use mosaic_node_store::{Blob, BlobStore, NodeStateRef, NodeStore, Path};

use crate::{
    CompositeNodeBuilder, CompositeNodeState, CompositionContext, Error, MountInfoProvider,
    NodeHandle, NodeMap,
};

/// One tree over a global store and one store per named mount.
///
/// # Example
///
/// ```rust
/// use mosaic_composite::{CompositeNodeStore, MountInfoProvider};
/// use mosaic_node_store::{name, MemoryNodeStore, NodeBuilder, NodeStore};
///
/// let mip = MountInfoProvider::builder().mount("libs", &["/libs"]).build().unwrap();
/// let store = CompositeNodeStore::configure(mip, MemoryNodeStore::new())
///     .add_mount("libs", MemoryNodeStore::new())
///     .build()
///     .unwrap();
///
/// let root = store.builder();
/// root.child(&name!("libs")).unwrap();
/// root.child(&name!("content")).unwrap();
///
/// assert!(root.get_child_node(&name!("libs")).exists());
/// assert_eq!(root.child_node_names(), vec![name!("content"), name!("libs")]);
/// ```
pub struct CompositeNodeStore<S: NodeStore> {
    ctx: Arc<CompositionContext>,
    /// Backing stores, aligned with `ctx.all_stores()`.
    stores: Vec<Arc<S>>,
}

impl<S: NodeStore + 'static> CompositeNodeStore<S> {
    /// Start assembling a composite store over `global`, which serves the
    /// default mount and creates all blobs.
    pub fn configure(mip: MountInfoProvider, global: S) -> CompositeNodeStoreBuilder<S> {
        CompositeNodeStoreBuilder {
            mip,
            global,
            mounts: BTreeMap::new(),
        }
    }

    pub fn context(&self) -> &Arc<CompositionContext> {
        &self.ctx
    }

    pub fn global_store(&self) -> &S {
        &self.stores[0]
    }

    /// The backing store of the named mount.
    pub fn mount_store(&self, name: &str) -> Option<&S> {
        let mounted = self.ctx.store_by_name(name)?;
        self.stores.get(mounted.index()).map(|s| s.as_ref())
    }

    fn entries<T>(&self, f: impl Fn(&S) -> T) -> NodeMap<T> {
        NodeMap::from_entries(
            self.ctx
                .all_stores()
                .iter()
                .cloned()
                .zip(self.stores.iter().map(|s| f(s))),
        )
    }

    /// Snapshot of the composite root.
    pub fn root_state(&self) -> CompositeNodeState {
        CompositeNodeState::new(Path::root(), self.ctx.clone(), self.entries(|s| s.root()))
    }

    /// Start a write session: one session per backing store, joined under a
    /// composite root builder.
    pub fn root_builder(&self) -> CompositeNodeBuilder<S::Builder> {
        CompositeNodeBuilder::new_root(self.ctx.clone(), self.entries(|s| s.builder()))
    }
}

impl<S: NodeStore + 'static> BlobStore for CompositeNodeStore<S> {
    fn create_blob(&self, reader: &mut dyn Read) -> Result<Blob, mosaic_node_store::Error> {
        self.ctx.create_blob(reader)
    }
}

impl<S: NodeStore + 'static> NodeStore for CompositeNodeStore<S> {
    type Builder = NodeHandle<S::Builder>;

    fn root(&self) -> NodeStateRef {
        Arc::new(self.root_state())
    }

    fn builder(&self) -> NodeHandle<S::Builder> {
        NodeHandle::Composite(self.root_builder())
    }
}

/// Builder for [`CompositeNodeStore`].
pub struct CompositeNodeStoreBuilder<S: NodeStore> {
    mip: MountInfoProvider,
    global: S,
    mounts: BTreeMap<String, S>,
}

impl<S: NodeStore + 'static> CompositeNodeStoreBuilder<S> {
    /// Register the backing store of the named mount.
    pub fn add_mount(mut self, name: impl Into<String>, store: S) -> Self {
        self.mounts.insert(name.into(), store);
        self
    }

    /// # Errors
    ///
    /// - [`Error::MissingStore`] if a mount has no store
    /// - [`Error::InvalidMount`] if a store was added for an unknown mount
    pub fn build(mut self) -> Result<CompositeNodeStore<S>, Error> {
        if let Some(unknown) = self
            .mounts
            .keys()
            .find(|name| self.mip.mount_by_name(name).map_or(true, |m| m.is_default()))
        {
            return Err(Error::InvalidMount {
                message: format!("no mount named '{}'", unknown),
            });
        }

        let global = Arc::new(self.global);
        let mut stores = vec![global.clone()];
        for mount in self.mip.non_default_mounts() {
            let store = self.mounts.remove(mount.name()).ok_or_else(|| Error::MissingStore {
                mount: mount.name().to_string(),
            })?;
            stores.push(Arc::new(store));
        }

        debug!(
            "composite store over {} mounts",
            self.mip.non_default_mounts().len()
        );
        let ctx = Arc::new(CompositionContext::new(self.mip, global));
        Ok(CompositeNodeStore { ctx, stores })
    }
}
