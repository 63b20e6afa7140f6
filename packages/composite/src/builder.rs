//! The composite node builder.
//!
//! A [`CompositeNodeBuilder`] is a mutable handle on one node of the
//! composite tree. It keeps one per-store builder for each backing store,
//! all addressing the same path, and routes every operation to the store or
//! stores responsible for it:
//!
//! - properties, existence and removal go to the store owning the node
//! - child listings and counts are gathered from all contributing stores
//! - a child is read and written in the store owning the child's path
//!
//! Per-store builders for a child are derived lazily, so stores a caller
//! never visits are never touched. When a child is written into a store
//! that has no node at this path yet, the missing ancestors are created in
//! that store first.

use std::fmt;
use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, warn};
use mosaic_node_store::provenance::{self, SOURCE_PATH};
use mosaic_node_store::{
    missing_node, Blob, Error, Name, NodeBuilder, NodeState, NodeStateRef, Path, PropertyState,
    EMPTY_NODE,
};

use crate::{CompositeNodeState, CompositionContext, MountedNodeStore, NodeHandle, NodeMap};

type MapCell<B> = Arc<RwLock<NodeMap<B>>>;

/// A mutable handle on a node whose children may span several stores.
///
/// Cloning yields a handle sharing the same per-store builders.
#[derive(Clone)]
pub struct CompositeNodeBuilder<B: NodeBuilder> {
    path: Path,
    ctx: Arc<CompositionContext>,
    builders: MapCell<B>,
    owner: MountedNodeStore,
    /// Builders of the tree root; `None` when this is the root.
    root: Option<MapCell<B>>,
    /// Serializes ancestor synthesis across the session.
    synthesis: Arc<Mutex<()>>,
}

impl<B: NodeBuilder> CompositeNodeBuilder<B> {
    /// Create the root builder of a write session from one root builder per
    /// store.
    pub fn new_root(ctx: Arc<CompositionContext>, builders: NodeMap<B>) -> Self {
        let path = Path::root();
        let owner = ctx.owning_store(&path).clone();
        Self {
            path,
            ctx,
            builders: Arc::new(RwLock::new(builders)),
            owner,
            root: None,
            synthesis: Arc::new(Mutex::new(())),
        }
    }

    fn child_builder(&self, path: Path, builders: NodeMap<B>) -> Self {
        let owner = self.ctx.owning_store(&path).clone();
        Self {
            path,
            ctx: self.ctx.clone(),
            builders: Arc::new(RwLock::new(builders)),
            owner,
            root: Some(self.root_cell().clone()),
            synthesis: self.synthesis.clone(),
        }
    }

    fn root_cell(&self) -> &MapCell<B> {
        self.root.as_ref().unwrap_or(&self.builders)
    }

    /// The root builder of this session.
    pub fn root_builder(&self) -> Self {
        match &self.root {
            None => self.clone(),
            Some(cell) => {
                let path = Path::root();
                let owner = self.ctx.owning_store(&path).clone();
                Self {
                    path,
                    ctx: self.ctx.clone(),
                    builders: cell.clone(),
                    owner,
                    root: None,
                    synthesis: self.synthesis.clone(),
                }
            }
        }
    }

    /// The current per-store map.
    fn map(&self) -> NodeMap<B> {
        self.builders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The builder `store` contributes at this node's path.
    pub fn node_builder(&self, store: &MountedNodeStore) -> B {
        self.builders.read().unwrap_or_else(PoisonError::into_inner)[store].clone()
    }

    fn wrapped(&self) -> B {
        self.node_builder(&self.owner)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn context(&self) -> &Arc<CompositionContext> {
        &self.ctx
    }

    /// The store owning this node.
    pub fn owning_store(&self) -> &MountedNodeStore {
        &self.owner
    }

    /// Snapshot of this node as currently modified.
    pub fn node_state(&self) -> NodeStateRef {
        let states = self.map().map_eager(|_, builder| {
            if builder.exists() {
                builder.node_state()
            } else {
                missing_node()
            }
        });
        Arc::new(CompositeNodeState::new(self.path.clone(), self.ctx.clone(), states))
    }

    /// Snapshot of this node as it was when the session started.
    pub fn base_state(&self) -> NodeStateRef {
        let states = self.map().map_eager(|_, builder| builder.base_state());
        Arc::new(CompositeNodeState::new(self.path.clone(), self.ctx.clone(), states))
    }

    pub fn exists(&self) -> bool {
        self.wrapped().exists()
    }

    pub fn is_new(&self) -> bool {
        self.wrapped().is_new()
    }

    pub fn is_new_property(&self, name: &str) -> bool {
        self.wrapped().is_new_property(name)
    }

    pub fn is_modified(&self) -> bool {
        self.wrapped().is_modified()
    }

    pub fn is_replaced(&self) -> bool {
        self.wrapped().is_replaced()
    }

    pub fn is_replaced_property(&self, name: &str) -> bool {
        self.wrapped().is_replaced_property(name)
    }

    pub fn property_count(&self) -> u64 {
        self.wrapped().property_count()
    }

    pub fn properties(&self) -> Vec<PropertyState> {
        self.wrapped().properties()
    }

    pub fn property(&self, name: &str) -> Option<PropertyState> {
        self.wrapped().property(name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.wrapped().has_property(name)
    }

    pub fn get_boolean(&self, name: &str) -> bool {
        self.wrapped().get_boolean(name)
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.wrapped().get_string(name)
    }

    pub fn get_name(&self, name: &str) -> Option<String> {
        self.wrapped().get_name(name)
    }

    pub fn get_names(&self, name: &str) -> Vec<String> {
        self.wrapped().get_names(name)
    }

    pub fn set_property(&self, property: PropertyState) -> Result<&Self, Error> {
        self.wrapped().set_property(property)?;
        Ok(self)
    }

    pub fn remove_property(&self, name: &str) -> Result<&Self, Error> {
        self.wrapped().remove_property(name)?;
        Ok(self)
    }

    fn contributing_stores(&self, map: &NodeMap<B>) -> Vec<MountedNodeStore> {
        self.ctx
            .contributing_stores(&self.path, |s| map[s].child_node_names())
    }

    pub fn child_node_count(&self, max: u64) -> u64 {
        let map = self.map();
        let stores = self.contributing_stores(&map);
        self.ctx.child_node_count(
            &self.path,
            &stores,
            |s, max| map[s].child_node_count(max),
            |s| map[s].child_node_names(),
            max,
        )
    }

    pub fn child_node_names(&self) -> Vec<Name> {
        let map = self.map();
        let stores = self.contributing_stores(&map);
        self.ctx
            .child_node_names(&self.path, &stores, |s| map[s].child_node_names())
    }

    /// Asks only the store owning the child's path.
    pub fn has_child_node(&self, name: &Name) -> bool {
        let store = self.ctx.owning_store(&self.path.child(name));
        self.node_builder(store).has_child_node(name)
    }

    /// The named child if it exists, otherwise a newly created one.
    pub fn child(&self, name: &Name) -> Result<NodeHandle<B>, Error> {
        if self.has_child_node(name) {
            Ok(self.get_child_node(name))
        } else {
            self.set_child_node(name)
        }
    }

    /// A handle on the named child.
    ///
    /// Returns the owning store's builder directly when the child cannot
    /// have children from other stores.
    pub fn get_child_node(&self, name: &Name) -> NodeHandle<B> {
        let child_path = self.path.child(name);
        if !self.ctx.should_be_composite(&child_path) {
            let store = self.ctx.owning_store(&child_path);
            return NodeHandle::Mounted(self.node_builder(store).get_child_node(name));
        }
        let child_name = name.clone();
        let builders = self
            .map()
            .map_lazy(move |_, builder| builder.get_child_node(&child_name));
        NodeHandle::Composite(self.child_builder(child_path, builders))
    }

    pub fn set_child_node(&self, name: &Name) -> Result<NodeHandle<B>, Error> {
        self.set_child_node_state(name, EMPTY_NODE.as_ref())
    }

    /// Create (or replace) the named child with a copy of `state`, in the
    /// store owning the child's path.
    ///
    /// # Errors
    ///
    /// [`Error::NodeNotFound`] if this node does not exist.
    pub fn set_child_node_state(
        &self,
        name: &Name,
        state: &dyn NodeState,
    ) -> Result<NodeHandle<B>, Error> {
        if !self.exists() {
            return Err(Error::NodeNotFound {
                path: self.path.clone(),
            });
        }

        let child_path = self.path.child(name);
        let child_store = self.ctx.owning_store(&child_path).clone();
        if child_store != self.owner {
            self.ensure_ancestors(&child_store)?;
        }

        let child = self
            .node_builder(&child_store)
            .set_child_node_state(name, state)?;
        if !self.ctx.should_be_composite(&child_path) {
            return Ok(NodeHandle::Mounted(child));
        }

        let child_name = name.clone();
        let builders = self
            .map()
            .map_lazy(move |_, builder| builder.get_child_node(&child_name))
            .with_replaced(&child_store, child);
        Ok(NodeHandle::Composite(self.child_builder(child_path, builders)))
    }

    /// Make sure this node's path exists in `store`. Missing nodes are
    /// created starting from the store's root, and the result becomes this
    /// node's builder for `store`.
    fn ensure_ancestors(&self, store: &MountedNodeStore) -> Result<(), Error> {
        let _guard = self.synthesis.lock().unwrap_or_else(PoisonError::into_inner);
        if self.node_builder(store).exists() {
            return Ok(());
        }

        let root = self
            .root_cell()
            .read()
            .unwrap_or_else(PoisonError::into_inner)[store]
            .clone();
        let mut builder = root;
        for name in self.path.iter() {
            builder = builder.child(name)?;
        }

        let mut map = self.builders.write().unwrap_or_else(PoisonError::into_inner);
        *map = map.with_replaced(store, builder);
        debug!(
            "created ancestors of {} in mount '{}'",
            self.path,
            store.mount().name()
        );
        Ok(())
    }

    /// Remove this node from its owning store.
    pub fn remove(&self) -> bool {
        self.wrapped().remove()
    }

    /// Move this node to `new_parent` under `new_name`.
    ///
    /// The node's composite snapshot is copied to the new location and the
    /// node is removed from its owning store. Unless the node was created in
    /// this session, the copy is annotated with the node's original path so
    /// that [`provenance::source_path`] can recover it.
    ///
    /// Returns `false`, without changing anything, if this node is the root
    /// or does not exist, if `new_parent` does not exist, or if it already
    /// has a child called `new_name`. If the copy fails, the annotation is
    /// rolled back and `false` is returned.
    pub fn move_to<P: NodeBuilder>(&self, new_parent: &P, new_name: &Name) -> bool {
        if self.path.is_root() {
            debug!("rejecting move of the root");
            return false;
        }
        if !self.exists() {
            debug!("rejecting move of {}: node does not exist", self.path);
            return false;
        }
        if new_parent.has_child_node(new_name) {
            debug!("rejecting move of {}: target {} exists", self.path, new_name);
            return false;
        }
        if !new_parent.exists() {
            debug!("rejecting move of {}: target parent does not exist", self.path);
            return false;
        }

        let previous = self.property(SOURCE_PATH);
        if let Err(e) = self.annotate_source_path() {
            warn!("cannot annotate source of {}: {}", self.path, e);
            return false;
        }
        let state = self.node_state();
        if let Err(e) = new_parent.set_child_node_state(new_name, state.as_ref()) {
            warn!("cannot move {} to {}: {}", self.path, new_name, e);
            if let Err(e) = provenance::restore_annotation(&self.wrapped(), previous) {
                warn!("cannot restore source of {}: {}", self.path, e);
            }
            return false;
        }
        self.remove();
        debug!("moved {} to {}", self.path, new_name);
        true
    }

    fn annotate_source_path(&self) -> Result<(), Error> {
        let root = NodeHandle::Composite(self.root_builder());
        let source = provenance::source_path(&root, &self.path)?;
        if !provenance::is_transiently_added(root.base_state(), &source) {
            self.set_property(PropertyState::new(SOURCE_PATH, source.to_string())?)?;
        }
        Ok(())
    }

    /// The path this node had when the session started, following move
    /// annotations on the way down from the root.
    pub fn source_path(&self) -> Result<Path, Error> {
        let root = NodeHandle::Composite(self.root_builder());
        provenance::source_path(&root, &self.path)
    }

    /// Create a blob in the global store.
    pub fn create_blob(&self, reader: &mut dyn Read) -> Result<Blob, Error> {
        self.ctx.create_blob(reader)
    }
}

impl<B: NodeBuilder> fmt::Debug for CompositeNodeBuilder<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeNodeBuilder")
            .field("path", &self.path)
            .field("owner", &self.owner.mount().name())
            .field("builders", &*self.builders.read().unwrap_or_else(PoisonError::into_inner))
            .finish()
    }
}
