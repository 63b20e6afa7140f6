//! Immutable node snapshots.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::value::access;
use crate::{Name, PropertyState};

/// Child count reported when a store cannot or will not count exactly.
pub const UNBOUNDED_CHILD_COUNT: u64 = u64::MAX;

/// A shared, immutable node snapshot.
pub type NodeStateRef = Arc<dyn NodeState>;

/// A read-only snapshot of one node and, transitively, its subtree.
///
/// # Object Safety
///
/// This trait is object-safe: snapshots from different stores and the
/// composite layer are exchanged as [`NodeStateRef`].
pub trait NodeState: Send + Sync + fmt::Debug {
    /// Whether the node exists. Non-existing nodes have no properties and
    /// no children.
    fn exists(&self) -> bool;

    /// Number of properties.
    fn property_count(&self) -> u64 {
        self.properties().len() as u64
    }

    /// All properties, in name order.
    fn properties(&self) -> Vec<PropertyState>;

    /// The named property, if present.
    fn property(&self, name: &str) -> Option<PropertyState>;

    fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

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

    /// Number of children. Exact below `max`; at or above `max` the result
    /// is only known to be at least `max`, and may be
    /// [`UNBOUNDED_CHILD_COUNT`].
    fn child_node_count(&self, max: u64) -> u64;

    /// Names of all children.
    fn child_node_names(&self) -> Vec<Name>;

    fn has_child_node(&self, name: &Name) -> bool;

    /// The named child, or a non-existing node.
    fn child_node(&self, name: &Name) -> NodeStateRef;
}

lazy_static! {
    /// Shared snapshot of a node that does not exist.
    pub static ref MISSING_NODE: NodeStateRef = Arc::new(MissingNodeState);

    /// Shared snapshot of an existing node with no properties and no children.
    pub static ref EMPTY_NODE: NodeStateRef = Arc::new(MemoryNodeState::default());
}

/// The shared "missing node" sentinel.
pub fn missing_node() -> NodeStateRef {
    MISSING_NODE.clone()
}

/// The shared empty node.
pub fn empty_node() -> NodeStateRef {
    EMPTY_NODE.clone()
}

/// Snapshot of a node that does not exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingNodeState;

impl NodeState for MissingNodeState {
    fn exists(&self) -> bool {
        false
    }

    fn properties(&self) -> Vec<PropertyState> {
        Vec::new()
    }

    fn property(&self, _name: &str) -> Option<PropertyState> {
        None
    }

    fn child_node_count(&self, _max: u64) -> u64 {
        0
    }

    fn child_node_names(&self) -> Vec<Name> {
        Vec::new()
    }

    fn has_child_node(&self, _name: &Name) -> bool {
        false
    }

    fn child_node(&self, _name: &Name) -> NodeStateRef {
        missing_node()
    }
}

/// An in-memory node snapshot.
///
/// Children are reference counted, so copies of a tree share every subtree
/// they do not modify.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryNodeState {
    pub(crate) properties: BTreeMap<String, PropertyState>,
    pub(crate) children: BTreeMap<Name, Arc<MemoryNodeState>>,
}

impl MemoryNodeState {
    /// An empty node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep-copy any node state into memory.
    ///
    /// A non-existing state copies as an empty node.
    pub fn copy_of(state: &dyn NodeState) -> Self {
        let properties = state
            .properties()
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();
        let children = state
            .child_node_names()
            .into_iter()
            .map(|name| {
                let child = Arc::new(Self::copy_of(state.child_node(&name).as_ref()));
                (name, child)
            })
            .collect();
        Self {
            properties,
            children,
        }
    }

    /// Builder-style property setter, for assembling fixtures.
    #[must_use]
    pub fn with_property(mut self, property: PropertyState) -> Self {
        self.properties.insert(property.name().to_string(), property);
        self
    }

    /// Builder-style child setter, for assembling fixtures.
    #[must_use]
    pub fn with_child(mut self, name: Name, child: MemoryNodeState) -> Self {
        self.children.insert(name, Arc::new(child));
        self
    }

    pub(crate) fn child(&self, name: &Name) -> Option<&Arc<MemoryNodeState>> {
        self.children.get(name)
    }
}

impl NodeState for MemoryNodeState {
    fn exists(&self) -> bool {
        true
    }

    fn property_count(&self) -> u64 {
        self.properties.len() as u64
    }

    fn properties(&self) -> Vec<PropertyState> {
        self.properties.values().cloned().collect()
    }

    fn property(&self, name: &str) -> Option<PropertyState> {
        self.properties.get(name).cloned()
    }

    fn child_node_count(&self, _max: u64) -> u64 {
        self.children.len() as u64
    }

    fn child_node_names(&self) -> Vec<Name> {
        self.children.keys().cloned().collect()
    }

    fn has_child_node(&self, name: &Name) -> bool {
        self.children.contains_key(name)
    }

    fn child_node(&self, name: &Name) -> NodeStateRef {
        match self.children.get(name) {
            Some(child) => child.clone(),
            None => missing_node(),
        }
    }
}

/// Structural equality of two node states of any kind.
///
/// Two states are equal when both are missing, or both exist with the same
/// properties and children that are recursively equal.
pub fn node_states_equal(a: &dyn NodeState, b: &dyn NodeState) -> bool {
    if a.exists() != b.exists() {
        return false;
    }
    if !a.exists() {
        return true;
    }
    if a.property_count() != b.property_count() {
        return false;
    }
    if a
        .properties()
        .iter()
        .any(|p| b.property(p.name()).as_ref() != Some(p))
    {
        return false;
    }

    let mut a_names = a.child_node_names();
    let mut b_names = b.child_node_names();
    a_names.sort();
    b_names.sort();
    if a_names != b_names {
        return false;
    }
    a_names
        .iter()
        .all(|name| node_states_equal(a.child_node(name).as_ref(), b.child_node(name).as_ref()))
}

/// One item fed to [`accumulate_child_sizes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildCount {
    /// A child that counts once.
    Child(Name),
    /// A contributor that cannot be counted; the total is unbounded.
    Unbounded,
}

/// Count children across several contributors, stopping early.
///
/// Returns [`UNBOUNDED_CHILD_COUNT`] as soon as an [`ChildCount::Unbounded`]
/// item is seen, and stops consuming the iterator once the running total
/// reaches `max`. Below `max` the result is exact.
pub fn accumulate_child_sizes(items: impl IntoIterator<Item = ChildCount>, max: u64) -> u64 {
    let mut total: u64 = 0;
    for item in items {
        if item == ChildCount::Unbounded {
            return UNBOUNDED_CHILD_COUNT;
        }
        total += 1;
        if total == UNBOUNDED_CHILD_COUNT {
            return UNBOUNDED_CHILD_COUNT;
        } else if total >= max {
            return total;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{name, Value};

    fn prop(name: &str, value: impl Into<Value>) -> PropertyState {
        PropertyState::new(name, value).unwrap()
    }

    fn sample() -> MemoryNodeState {
        MemoryNodeState::new()
            .with_property(prop("title", "root"))
            .with_child(
                name!("a"),
                MemoryNodeState::new()
                    .with_property(prop("n", 1))
                    .with_child(name!("deep"), MemoryNodeState::new()),
            )
            .with_child(name!("b"), MemoryNodeState::new())
    }

    #[test]
    fn missing_node_is_empty() {
        let missing = missing_node();
        assert!(!missing.exists());
        assert_eq!(missing.property_count(), 0);
        assert_eq!(missing.child_node_count(10), 0);
        assert!(!missing.child_node(&name!("x")).exists());
    }

    #[test]
    fn empty_node_exists() {
        let empty = empty_node();
        assert!(empty.exists());
        assert!(empty.child_node_names().is_empty());
    }

    #[test]
    fn memory_state_navigation() {
        let state = sample();
        assert_eq!(state.child_node_count(u64::MAX), 2);
        assert!(state.has_child_node(&name!("a")));
        let a = state.child_node(&name!("a"));
        assert!(a.exists());
        assert_eq!(a.property("n").map(PropertyState::into_value), Some(Value::Long(1)));
        assert!(a.child_node(&name!("deep")).exists());
        assert!(!state.child_node(&name!("zzz")).exists());
    }

    #[test]
    fn typed_getters_on_state() {
        let state = MemoryNodeState::new()
            .with_property(prop("title", "Home"))
            .with_property(prop("flag", true));
        assert_eq!(state.get_string("title"), Some("Home".to_string()));
        assert!(state.get_boolean("flag"));
        assert!(!state.get_boolean("title"));
        assert_eq!(state.get_name("title"), None);
    }

    #[test]
    fn copy_of_is_structurally_equal() {
        let original = sample();
        let copy = MemoryNodeState::copy_of(&original);
        assert_eq!(copy, original);
        assert!(node_states_equal(&copy, &original));
    }

    #[test]
    fn copy_of_missing_is_empty() {
        let copy = MemoryNodeState::copy_of(MISSING_NODE.as_ref());
        assert_eq!(copy, MemoryNodeState::new());
    }

    #[test]
    fn equality_detects_differences() {
        let base = sample();
        let changed_prop = sample().with_property(prop("title", "other"));
        let extra_child = sample().with_child(name!("c"), MemoryNodeState::new());
        let deep_change = sample().with_child(
            name!("a"),
            MemoryNodeState::new().with_property(prop("n", 2)),
        );

        assert!(!node_states_equal(&base, &changed_prop));
        assert!(!node_states_equal(&base, &extra_child));
        assert!(!node_states_equal(&base, &deep_change));
        assert!(!node_states_equal(&base, MISSING_NODE.as_ref()));
        assert!(node_states_equal(MISSING_NODE.as_ref(), &MissingNodeState));
    }

    #[test]
    fn accumulate_exact_below_max() {
        let items = vec![
            ChildCount::Child(name!("a")),
            ChildCount::Child(name!("b")),
        ];
        assert_eq!(accumulate_child_sizes(items, 10), 2);
    }

    #[test]
    fn accumulate_stops_at_max() {
        let mut consumed = 0;
        let items = (0..100).map(|i| {
            consumed += 1;
            ChildCount::Child(Name::new(format!("n{}", i)).unwrap())
        });
        assert_eq!(accumulate_child_sizes(items, 5), 5);
        assert_eq!(consumed, 5);
    }

    #[test]
    fn accumulate_unbounded_short_circuits() {
        let items = vec![
            ChildCount::Child(name!("a")),
            ChildCount::Unbounded,
            ChildCount::Child(name!("b")),
        ];
        assert_eq!(accumulate_child_sizes(items, 10), UNBOUNDED_CHILD_COUNT);
    }
}
