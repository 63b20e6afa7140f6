//! The mutable node handle contract.

use std::io::Read;

use crate::value::access;
use crate::{Blob, Error, Name, NodeState, NodeStateRef, PropertyState, EMPTY_NODE};

/// A mutable handle on one node of a write session.
///
/// Builders are cheap handles: cloning one yields another handle on the same
/// node of the same session, and every mutation through any handle is visible
/// through all of them. A builder may address a node that does not exist
/// (yet); reads then behave like reads of a missing node and writes fail with
/// [`Error::NodeNotFound`].
///
/// Setters return `&Self` so calls can be chained:
///
/// ```rust
/// use mosaic_node_store::{MemoryNodeStore, NodeBuilder, NodeStore, PropertyState, name};
///
/// let store = MemoryNodeStore::new();
/// let root = store.builder();
/// let page = root.child(&name!("page")).unwrap();
/// page.set_property(PropertyState::new("title", "Home").unwrap())
///     .unwrap()
///     .set_property(PropertyState::new("hidden", false).unwrap())
///     .unwrap();
/// assert_eq!(page.property_count(), 2);
/// ```
pub trait NodeBuilder: Clone + Send + Sync + 'static {
    /// Snapshot of the node as currently modified.
    fn node_state(&self) -> NodeStateRef;

    /// Snapshot of the node as it was when the session started.
    fn base_state(&self) -> NodeStateRef;

    fn exists(&self) -> bool;

    /// Whether the node is absent from the base state.
    fn is_new(&self) -> bool;

    /// Whether the named property is absent from the base state but present now.
    fn is_new_property(&self, name: &str) -> bool;

    /// Whether properties or the set of children differ from the base state.
    fn is_modified(&self) -> bool;

    /// Whether the node existed in the base state and was replaced by other
    /// content, for example by [`NodeBuilder::set_child_node_state`].
    fn is_replaced(&self) -> bool;

    /// Whether the named property existed in the base state and now has a
    /// different value.
    fn is_replaced_property(&self, name: &str) -> bool;

    fn property_count(&self) -> u64;

    fn properties(&self) -> Vec<PropertyState>;

    fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    fn property(&self, name: &str) -> Option<PropertyState>;

    /// True only for a boolean property whose value is `true`.
    fn get_boolean(&self, name: &str) -> bool {
        access::boolean(self.property(name))
    }

    /// The value of a STRING property.
    fn get_string(&self, name: &str) -> Option<String> {
        access::string(self.property(name))
    }

    /// The value of a NAME property.
    fn get_name(&self, name: &str) -> Option<String> {
        access::name(self.property(name))
    }

    /// The values of a multi-valued NAME property, empty otherwise.
    fn get_names(&self, name: &str) -> Vec<String> {
        access::names(self.property(name))
    }

    /// Set (or replace) a property.
    fn set_property(&self, property: PropertyState) -> Result<&Self, Error>;

    /// Remove a property; removing an absent property is a no-op.
    fn remove_property(&self, name: &str) -> Result<&Self, Error>;

    /// Number of children, with the capping contract of
    /// [`NodeState::child_node_count`].
    fn child_node_count(&self, max: u64) -> u64;

    fn child_node_names(&self) -> Vec<Name>;

    fn has_child_node(&self, name: &Name) -> bool;

    /// The named child if it exists, otherwise a newly created empty child.
    fn child(&self, name: &Name) -> Result<Self, Error> {
        if self.has_child_node(name) {
            Ok(self.get_child_node(name))
        } else {
            self.set_child_node(name)
        }
    }

    /// A handle on the named child, whether or not it exists.
    fn get_child_node(&self, name: &Name) -> Self;

    /// Create (or replace) the named child as an empty node.
    fn set_child_node(&self, name: &Name) -> Result<Self, Error> {
        self.set_child_node_state(name, EMPTY_NODE.as_ref())
    }

    /// Create (or replace) the named child with a copy of `state`.
    ///
    /// # Errors
    ///
    /// [`Error::NodeNotFound`] if this node does not exist.
    fn set_child_node_state(&self, name: &Name, state: &dyn NodeState) -> Result<Self, Error>;

    /// Remove this node and its subtree. Returns `false` if there was
    /// nothing to remove or the node is the root.
    fn remove(&self) -> bool;

    /// Move this node to `new_parent` under `new_name`.
    ///
    /// Returns `false`, without changing anything, if this node is the root
    /// or does not exist, if `new_parent` does not exist, or if it already
    /// has a child called `new_name`.
    fn move_to<P: NodeBuilder>(&self, new_parent: &P, new_name: &Name) -> bool;

    /// Create a blob from a byte stream.
    fn create_blob(&self, reader: &mut dyn Read) -> Result<Blob, Error>;
}
