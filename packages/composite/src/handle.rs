//! Node handles of the composite tree.

use std::io::Read;

use mosaic_node_store::{Blob, Error, Name, NodeBuilder, NodeState, NodeStateRef, PropertyState};

use crate::CompositeNodeBuilder;

/// A handle on a node of the composite tree.
///
/// Nodes whose children all live in one store are served by that store's
/// builder directly; the others by a [`CompositeNodeBuilder`].
#[derive(Clone, Debug)]
pub enum NodeHandle<B: NodeBuilder> {
    Mounted(B),
    Composite(CompositeNodeBuilder<B>),
}

impl<B: NodeBuilder> NodeHandle<B> {
    pub fn is_composite(&self) -> bool {
        matches!(self, NodeHandle::Composite(_))
    }
}

impl<B: NodeBuilder> From<CompositeNodeBuilder<B>> for NodeHandle<B> {
    fn from(builder: CompositeNodeBuilder<B>) -> Self {
        NodeHandle::Composite(builder)
    }
}

macro_rules! dispatch {
    ($self:ident, $b:ident => $e:expr) => {
        match $self {
            NodeHandle::Mounted($b) => $e,
            NodeHandle::Composite($b) => $e,
        }
    };
}

impl<B: NodeBuilder> NodeBuilder for NodeHandle<B> {
    fn node_state(&self) -> NodeStateRef {
        dispatch!(self, b => b.node_state())
    }

    fn base_state(&self) -> NodeStateRef {
        dispatch!(self, b => b.base_state())
    }

    fn exists(&self) -> bool {
        dispatch!(self, b => b.exists())
    }

    fn is_new(&self) -> bool {
        dispatch!(self, b => b.is_new())
    }

    fn is_new_property(&self, name: &str) -> bool {
        dispatch!(self, b => b.is_new_property(name))
    }

    fn is_modified(&self) -> bool {
        dispatch!(self, b => b.is_modified())
    }

    fn is_replaced(&self) -> bool {
        dispatch!(self, b => b.is_replaced())
    }

    fn is_replaced_property(&self, name: &str) -> bool {
        dispatch!(self, b => b.is_replaced_property(name))
    }

    fn property_count(&self) -> u64 {
        dispatch!(self, b => b.property_count())
    }

    fn properties(&self) -> Vec<PropertyState> {
        dispatch!(self, b => b.properties())
    }

    fn property(&self, name: &str) -> Option<PropertyState> {
        dispatch!(self, b => b.property(name))
    }

    fn set_property(&self, property: PropertyState) -> Result<&Self, Error> {
        dispatch!(self, b => b.set_property(property).map(|_| ()))?;
        Ok(self)
    }

    fn remove_property(&self, name: &str) -> Result<&Self, Error> {
        dispatch!(self, b => b.remove_property(name).map(|_| ()))?;
        Ok(self)
    }

    fn child_node_count(&self, max: u64) -> u64 {
        dispatch!(self, b => b.child_node_count(max))
    }

    fn child_node_names(&self) -> Vec<Name> {
        dispatch!(self, b => b.child_node_names())
    }

    fn has_child_node(&self, name: &Name) -> bool {
        dispatch!(self, b => b.has_child_node(name))
    }

    fn get_child_node(&self, name: &Name) -> Self {
        match self {
            NodeHandle::Mounted(b) => NodeHandle::Mounted(b.get_child_node(name)),
            NodeHandle::Composite(b) => b.get_child_node(name),
        }
    }

    fn set_child_node_state(&self, name: &Name, state: &dyn NodeState) -> Result<Self, Error> {
        match self {
            NodeHandle::Mounted(b) => Ok(NodeHandle::Mounted(b.set_child_node_state(name, state)?)),
            NodeHandle::Composite(b) => b.set_child_node_state(name, state),
        }
    }

    fn remove(&self) -> bool {
        dispatch!(self, b => b.remove())
    }

    fn move_to<P: NodeBuilder>(&self, new_parent: &P, new_name: &Name) -> bool {
        dispatch!(self, b => b.move_to(new_parent, new_name))
    }

    fn create_blob(&self, reader: &mut dyn Read) -> Result<Blob, Error> {
        dispatch!(self, b => b.create_blob(reader))
    }
}
