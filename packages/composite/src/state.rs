//! Read-only snapshots of the composite tree.

use std::fmt;
use std::sync::Arc;

use mosaic_node_store::{Name, NodeState, NodeStateRef, Path, PropertyState};

use crate::{CompositionContext, MountedNodeStore, NodeMap};

/// A snapshot of one node of the composite tree.
///
/// Properties come from the store owning the node. Children are gathered
/// from every contributing store, with the same routing as
/// [`CompositeNodeBuilder`](crate::CompositeNodeBuilder).
pub struct CompositeNodeState {
    path: Path,
    ctx: Arc<CompositionContext>,
    states: NodeMap<NodeStateRef>,
    owner: MountedNodeStore,
}

impl CompositeNodeState {
    /// Assemble a snapshot from one state per store, all at `path`.
    pub fn new(path: Path, ctx: Arc<CompositionContext>, states: NodeMap<NodeStateRef>) -> Self {
        let owner = ctx.owning_store(&path).clone();
        Self {
            path,
            ctx,
            states,
            owner,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The state contributed by `store`.
    pub fn node_state(&self, store: &MountedNodeStore) -> Option<&NodeStateRef> {
        self.states.get(store)
    }

    fn owning_state(&self) -> &NodeStateRef {
        &self.states[&self.owner]
    }

    fn contributing_stores(&self) -> Vec<MountedNodeStore> {
        self.ctx
            .contributing_stores(&self.path, |s| self.states[s].child_node_names())
    }
}

impl NodeState for CompositeNodeState {
    fn exists(&self) -> bool {
        self.owning_state().exists()
    }

    fn property_count(&self) -> u64 {
        self.owning_state().property_count()
    }

    fn properties(&self) -> Vec<PropertyState> {
        self.owning_state().properties()
    }

    fn property(&self, name: &str) -> Option<PropertyState> {
        self.owning_state().property(name)
    }

    fn child_node_count(&self, max: u64) -> u64 {
        let stores = self.contributing_stores();
        self.ctx.child_node_count(
            &self.path,
            &stores,
            |s, max| self.states[s].child_node_count(max),
            |s| self.states[s].child_node_names(),
            max,
        )
    }

    fn child_node_names(&self) -> Vec<Name> {
        let stores = self.contributing_stores();
        self.ctx
            .child_node_names(&self.path, &stores, |s| self.states[s].child_node_names())
    }

    fn has_child_node(&self, name: &Name) -> bool {
        let store = self.ctx.owning_store(&self.path.child(name));
        self.states[store].has_child_node(name)
    }

    fn child_node(&self, name: &Name) -> NodeStateRef {
        let child_path = self.path.child(name);
        if !self.ctx.should_be_composite(&child_path) {
            let store = self.ctx.owning_store(&child_path);
            return self.states[store].child_node(name);
        }
        let child_name = name.clone();
        let states = self
            .states
            .map_lazy(move |_, state| state.child_node(&child_name));
        Arc::new(CompositeNodeState::new(child_path, self.ctx.clone(), states))
    }
}

impl fmt::Debug for CompositeNodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeNodeState")
            .field("path", &self.path)
            .field("owner", &self.owner.mount().name())
            .finish()
    }
}
