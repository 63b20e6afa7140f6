//! In-memory node store.
//!
//! A [`MemoryNodeStore`] holds one persistent tree. Each call to
//! [`NodeStore::builder`] starts a write session: a base tree (the store's
//! root at that moment) and a head tree that all builders of the session
//! modify. Both trees are structurally shared, so a session only copies the
//! nodes on the paths it actually changes.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, warn};

use crate::provenance::{self, SOURCE_PATH};
use crate::{
    missing_node, Blob, BlobStore, Error, MemoryNodeState, Name, NodeBuilder, NodeState,
    NodeStateRef, NodeStore, Path, PropertyState,
};

/// State shared by every builder of one write session.
struct Session {
    base: Arc<MemoryNodeState>,
    head: Arc<MemoryNodeState>,
    /// Paths of base nodes that were overwritten by `set_child_node_state`.
    replaced: BTreeSet<Path>,
}

fn lookup<'a>(root: &'a Arc<MemoryNodeState>, path: &Path) -> Option<&'a Arc<MemoryNodeState>> {
    let mut node = root;
    for name in path.iter() {
        node = node.child(name)?;
    }
    Some(node)
}

/// Navigate to a node for writing, copying shared nodes along the way.
///
/// Callers check existence with [`lookup`] first so that a miss does not
/// copy anything.
fn lookup_mut<'a>(root: &'a mut Arc<MemoryNodeState>, path: &Path) -> Option<&'a mut MemoryNodeState> {
    let mut node = root;
    for name in path.iter() {
        let current = node;
        node = Arc::make_mut(current).children.get_mut(name)?;
    }
    Some(Arc::make_mut(node))
}

/// A builder for one node of a [`MemoryNodeStore`] write session.
///
/// Cloning is cheap and yields a handle on the same node of the same session.
#[derive(Clone)]
pub struct MemoryNodeBuilder {
    session: Arc<RwLock<Session>>,
    path: Path,
}

impl MemoryNodeBuilder {
    /// Start a session over `base`, returning the root builder.
    pub fn new(base: Arc<MemoryNodeState>) -> Self {
        let session = Session {
            head: base.clone(),
            base,
            replaced: BTreeSet::new(),
        };
        Self {
            session: Arc::new(RwLock::new(session)),
            path: Path::root(),
        }
    }

    /// The path of this builder's node within its tree.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn head(&self) -> Option<Arc<MemoryNodeState>> {
        lookup(&self.read().head, &self.path).cloned()
    }

    fn base(&self) -> Option<Arc<MemoryNodeState>> {
        lookup(&self.read().base, &self.path).cloned()
    }

    fn with_path(&self, path: Path) -> Self {
        Self {
            session: self.session.clone(),
            path,
        }
    }

    /// Apply `f` to this node in the head tree.
    fn update<R>(&self, f: impl FnOnce(&mut MemoryNodeState) -> R) -> Result<R, Error> {
        let mut guard = self.write();
        let not_found = || Error::NodeNotFound {
            path: self.path.clone(),
        };
        if lookup(&guard.head, &self.path).is_none() {
            return Err(not_found());
        }
        let node = lookup_mut(&mut guard.head, &self.path).ok_or_else(not_found)?;
        Ok(f(node))
    }

    /// The whole head tree of the session.
    fn head_root(&self) -> Arc<MemoryNodeState> {
        self.read().head.clone()
    }

    /// Make `root` the new base of the session.
    fn rebase(&self, root: Arc<MemoryNodeState>) {
        let mut session = self.write();
        session.base = root;
        session.replaced.clear();
    }

    fn annotate_source_path(&self) -> Result<(), Error> {
        let root = self.with_path(Path::root());
        let source = provenance::source_path(&root, &self.path)?;
        if !provenance::is_transiently_added(root.base_state(), &source) {
            self.set_property(PropertyState::new(SOURCE_PATH, source.to_string())?)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MemoryNodeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryNodeBuilder")
            .field("path", &self.path)
            .finish()
    }
}

fn as_state(node: Option<Arc<MemoryNodeState>>) -> NodeStateRef {
    match node {
        Some(node) => node,
        None => missing_node(),
    }
}

impl NodeBuilder for MemoryNodeBuilder {
    fn node_state(&self) -> NodeStateRef {
        as_state(self.head())
    }

    fn base_state(&self) -> NodeStateRef {
        as_state(self.base())
    }

    fn exists(&self) -> bool {
        lookup(&self.read().head, &self.path).is_some()
    }

    fn is_new(&self) -> bool {
        let session = self.read();
        lookup(&session.base, &self.path).is_none() && lookup(&session.head, &self.path).is_some()
    }

    fn is_new_property(&self, name: &str) -> bool {
        let in_base = self.base().is_some_and(|n| n.properties.contains_key(name));
        let in_head = self.head().is_some_and(|n| n.properties.contains_key(name));
        in_head && !in_base
    }

    fn is_modified(&self) -> bool {
        match (self.base(), self.head()) {
            (Some(base), Some(head)) => {
                base.properties != head.properties
                    || !base.children.keys().eq(head.children.keys())
            }
            _ => false,
        }
    }

    fn is_replaced(&self) -> bool {
        let session = self.read();
        lookup(&session.base, &self.path).is_some() && session.replaced.contains(&self.path)
    }

    fn is_replaced_property(&self, name: &str) -> bool {
        let base = self.base().and_then(|n| n.property(name));
        let head = self.head().and_then(|n| n.property(name));
        matches!((base, head), (Some(b), Some(h)) if b != h)
    }

    fn property_count(&self) -> u64 {
        self.head().map_or(0, |n| n.properties.len() as u64)
    }

    fn properties(&self) -> Vec<PropertyState> {
        self.head().map(|n| n.properties()).unwrap_or_default()
    }

    fn property(&self, name: &str) -> Option<PropertyState> {
        self.head().and_then(|n| n.property(name))
    }

    fn set_property(&self, property: PropertyState) -> Result<&Self, Error> {
        self.update(|node| {
            node.properties.insert(property.name().to_string(), property);
        })?;
        Ok(self)
    }

    fn remove_property(&self, name: &str) -> Result<&Self, Error> {
        self.update(|node| {
            node.properties.remove(name);
        })?;
        Ok(self)
    }

    fn child_node_count(&self, _max: u64) -> u64 {
        self.head().map_or(0, |n| n.children.len() as u64)
    }

    fn child_node_names(&self) -> Vec<Name> {
        self.head()
            .map(|n| n.children.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn has_child_node(&self, name: &Name) -> bool {
        self.head().is_some_and(|n| n.children.contains_key(name))
    }

    fn get_child_node(&self, name: &Name) -> Self {
        self.with_path(self.path.child(name))
    }

    fn set_child_node_state(&self, name: &Name, state: &dyn NodeState) -> Result<Self, Error> {
        // Copy before locking: `state` may read from this very session.
        let copy = Arc::new(MemoryNodeState::copy_of(state));
        let child_path = self.path.child(name);

        let mut guard = self.write();
        let session = &mut *guard;
        if lookup(&session.head, &self.path).is_none() {
            return Err(Error::NodeNotFound {
                path: self.path.clone(),
            });
        }
        let in_base = lookup(&session.base, &child_path).is_some();
        if let Some(parent) = lookup_mut(&mut session.head, &self.path) {
            parent.children.insert(name.clone(), copy);
        }
        if in_base {
            session.replaced.insert(child_path.clone());
        }
        drop(guard);

        Ok(self.with_path(child_path))
    }

    fn remove(&self) -> bool {
        let (Some(parent), Some(name)) = (self.path.parent(), self.path.name()) else {
            return false;
        };
        let mut guard = self.write();
        if lookup(&guard.head, &self.path).is_none() {
            return false;
        }
        match lookup_mut(&mut guard.head, &parent) {
            Some(parent) => parent.children.remove(name).is_some(),
            None => false,
        }
    }

    fn move_to<P: NodeBuilder>(&self, new_parent: &P, new_name: &Name) -> bool {
        if self.path.is_root() || !self.exists() || new_parent.has_child_node(new_name) {
            debug!("rejecting move of {} to {}", self.path, new_name);
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
            if let Err(e) = provenance::restore_annotation(self, previous) {
                warn!("cannot restore source of {}: {}", self.path, e);
            }
            return false;
        }
        self.remove();
        true
    }

    fn create_blob(&self, reader: &mut dyn Read) -> Result<Blob, Error> {
        Ok(Blob::from_reader(reader)?)
    }
}

/// A node store that keeps its tree in memory.
///
/// # Example
///
/// ```rust
/// use mosaic_node_store::{MemoryNodeStore, NodeBuilder, NodeStore, name};
///
/// let store = MemoryNodeStore::new();
///
/// let root = store.builder();
/// root.child(&name!("content")).unwrap();
/// store.merge(&root).unwrap();
///
/// assert!(store.root().has_child_node(&name!("content")));
/// ```
pub struct MemoryNodeStore {
    root: RwLock<Arc<MemoryNodeState>>,
}

impl MemoryNodeStore {
    /// Create a store with an empty root.
    pub fn new() -> Self {
        Self::with_root(MemoryNodeState::new())
    }

    /// Create a store with initial content.
    pub fn with_root(root: MemoryNodeState) -> Self {
        Self {
            root: RwLock::new(Arc::new(root)),
        }
    }

    /// Install the head of a session as the store's root.
    ///
    /// The session is rebased onto the new root, so its builders report no
    /// pending modifications afterwards. There is no conflict detection: the
    /// last merge wins.
    ///
    /// # Errors
    ///
    /// [`Error::NotRootBuilder`] if `builder` is not the session's root builder.
    pub fn merge(&self, builder: &MemoryNodeBuilder) -> Result<NodeStateRef, Error> {
        if !builder.path.is_root() {
            return Err(Error::NotRootBuilder {
                path: builder.path.clone(),
            });
        }
        let head = builder.head_root();
        *self.root.write().unwrap_or_else(PoisonError::into_inner) = head.clone();
        builder.rebase(head.clone());
        debug!("merged session with {} top-level nodes", head.children.len());
        Ok(head)
    }
}

impl Default for MemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for MemoryNodeStore {
    fn create_blob(&self, reader: &mut dyn Read) -> Result<Blob, Error> {
        Ok(Blob::from_reader(reader)?)
    }
}

impl NodeStore for MemoryNodeStore {
    type Builder = MemoryNodeBuilder;

    fn root(&self) -> NodeStateRef {
        self.root.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn builder(&self) -> MemoryNodeBuilder {
        let root = self.root.read().unwrap_or_else(PoisonError::into_inner).clone();
        MemoryNodeBuilder::new(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{name, node_states_equal, path, Value};

    fn prop(name: &str, value: impl Into<Value>) -> PropertyState {
        PropertyState::new(name, value).unwrap()
    }

    fn fixture() -> MemoryNodeStore {
        MemoryNodeStore::with_root(
            MemoryNodeState::new().with_child(
                name!("content"),
                MemoryNodeState::new()
                    .with_property(prop("title", "Content"))
                    .with_child(name!("page"), MemoryNodeState::new()),
            ),
        )
    }

    #[test]
    fn root_builder_exists() {
        let store = MemoryNodeStore::new();
        let root = store.builder();
        assert!(root.exists());
        assert!(!root.is_new());
        assert_eq!(root.path(), &Path::root());
    }

    #[test]
    fn child_creates_missing_nodes() {
        let store = MemoryNodeStore::new();
        let root = store.builder();
        let a = root.child(&name!("a")).unwrap();
        assert!(a.exists());
        assert!(a.is_new());
        assert_eq!(a.path(), &path!("/a"));
        assert!(root.has_child_node(&name!("a")));
    }

    #[test]
    fn child_returns_existing_node() {
        let store = fixture();
        let root = store.builder();
        let content = root.child(&name!("content")).unwrap();
        assert_eq!(content.get_string("title"), Some("Content".to_string()));
        assert!(!content.is_new());
    }

    #[test]
    fn handles_share_session() {
        let store = MemoryNodeStore::new();
        let root = store.builder();
        let a1 = root.child(&name!("a")).unwrap();
        let a2 = root.get_child_node(&name!("a"));
        a1.set_property(prop("x", 1)).unwrap();
        assert_eq!(a2.property("x").map(PropertyState::into_value), Some(Value::Long(1)));
    }

    #[test]
    fn writes_to_missing_node_fail() {
        let store = MemoryNodeStore::new();
        let ghost = store.builder().get_child_node(&name!("ghost"));
        assert!(!ghost.exists());
        assert!(matches!(
            ghost.set_property(prop("x", 1)),
            Err(Error::NodeNotFound { .. })
        ));
        assert!(matches!(
            ghost.set_child_node(&name!("child")),
            Err(Error::NodeNotFound { .. })
        ));
        assert!(ghost.remove_property("x").is_err());
    }

    #[test]
    fn missing_node_reads_are_empty() {
        let store = MemoryNodeStore::new();
        let ghost = store.builder().get_child_node(&name!("ghost"));
        assert_eq!(ghost.property_count(), 0);
        assert!(ghost.child_node_names().is_empty());
        assert!(!ghost.node_state().exists());
        assert!(!ghost.base_state().exists());
    }

    #[test]
    fn property_flags() {
        let store = fixture();
        let content = store.builder().get_child_node(&name!("content"));
        assert!(!content.is_modified());

        content.set_property(prop("title", "Changed")).unwrap();
        content.set_property(prop("fresh", true)).unwrap();

        assert!(content.is_modified());
        assert!(content.is_replaced_property("title"));
        assert!(!content.is_new_property("title"));
        assert!(content.is_new_property("fresh"));
        assert!(!content.is_replaced_property("fresh"));
        assert!(content.get_boolean("fresh"));
    }

    #[test]
    fn remove_property_is_idempotent() {
        let store = fixture();
        let content = store.builder().get_child_node(&name!("content"));
        content.remove_property("title").unwrap();
        content.remove_property("title").unwrap();
        assert!(!content.has_property("title"));
        assert!(content.is_modified());
    }

    #[test]
    fn set_child_node_state_replaces_content() {
        let store = fixture();
        let root = store.builder();
        let replacement = MemoryNodeState::new().with_property(prop("v", 2));
        let content = root
            .set_child_node_state(&name!("content"), &replacement)
            .unwrap();
        assert!(content.is_replaced());
        assert!(!content.has_child_node(&name!("page")));
        assert!(node_states_equal(content.node_state().as_ref(), &replacement));
        assert!(node_states_equal(
            content.base_state().as_ref(),
            fixture().root().child_node(&name!("content")).as_ref()
        ));
    }

    #[test]
    fn new_child_is_not_replaced() {
        let store = MemoryNodeStore::new();
        let a = store.builder().set_child_node(&name!("a")).unwrap();
        assert!(!a.is_replaced());
        assert!(a.is_new());
    }

    #[test]
    fn remove_node() {
        let store = fixture();
        let root = store.builder();
        let page = root
            .get_child_node(&name!("content"))
            .get_child_node(&name!("page"));
        assert!(page.remove());
        assert!(!page.exists());
        assert!(!page.remove());
        assert!(!root.remove());
        assert!(root.get_child_node(&name!("content")).is_modified());
    }

    #[test]
    fn session_is_isolated_until_merge() {
        let store = fixture();
        let root = store.builder();
        root.child(&name!("added")).unwrap();
        assert!(!store.root().has_child_node(&name!("added")));

        store.merge(&root).unwrap();
        assert!(store.root().has_child_node(&name!("added")));
        assert!(!root.get_child_node(&name!("added")).is_new());
    }

    #[test]
    fn merge_rejects_non_root_builder() {
        let store = fixture();
        let content = store.builder().get_child_node(&name!("content"));
        assert!(matches!(
            store.merge(&content),
            Err(Error::NotRootBuilder { .. })
        ));
    }

    #[test]
    fn move_within_session_annotates_source() {
        let store = fixture();
        let root = store.builder();
        let page = root
            .get_child_node(&name!("content"))
            .get_child_node(&name!("page"));
        let target = root.child(&name!("archive")).unwrap();

        assert!(page.move_to(&target, &name!("old")));
        assert!(!page.exists());

        let moved = target.get_child_node(&name!("old"));
        assert!(moved.exists());
        assert_eq!(
            moved.property(SOURCE_PATH).map(PropertyState::into_value),
            Some(Value::String("/content/page".to_string()))
        );
    }

    #[test]
    fn move_of_transient_node_is_not_annotated() {
        let store = MemoryNodeStore::new();
        let root = store.builder();
        let fresh = root.child(&name!("fresh")).unwrap();
        assert!(fresh.move_to(&root, &name!("renamed")));
        assert!(!root.get_child_node(&name!("renamed")).has_property(SOURCE_PATH));
    }

    #[test]
    fn move_rejections() {
        let store = fixture();
        let root = store.builder();
        let content = root.get_child_node(&name!("content"));

        assert!(!root.move_to(&content, &name!("x")));
        assert!(!root
            .get_child_node(&name!("ghost"))
            .move_to(&root, &name!("x")));
        assert!(!content.move_to(&root, &name!("content")));
        assert!(!content.move_to(&root.get_child_node(&name!("ghost")), &name!("x")));
        assert!(content.exists());
    }

    #[test]
    fn move_across_stores_copies_subtree() {
        let source = fixture();
        let target = MemoryNodeStore::new();
        let source_root = source.builder();
        let target_root = target.builder();

        let content = source_root.get_child_node(&name!("content"));
        assert!(content.move_to(&target_root, &name!("content")));

        let moved = target_root.get_child_node(&name!("content"));
        assert!(moved.has_child_node(&name!("page")));
        assert_eq!(moved.get_string("title"), Some("Content".to_string()));
        assert!(!content.exists());
    }

    #[test]
    fn create_blob_reads_stream() {
        let store = MemoryNodeStore::new();
        let mut input: &[u8] = b"binary";
        let blob = store.builder().create_blob(&mut input).unwrap();
        assert_eq!(blob.len(), 6);
        let mut input: &[u8] = b"xy";
        assert_eq!(BlobStore::create_blob(&store, &mut input).unwrap().len(), 2);
    }
}
