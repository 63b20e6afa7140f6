//! Store handles.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::Mount;

/// Identity of one backing store within a composite store.
///
/// Handles compare, order and hash by their index. The global store, which
/// serves the default mount, always has index 0; named mounts follow in
/// registration order.
#[derive(Debug, Clone)]
pub struct MountedNodeStore {
    index: usize,
    mount: Arc<Mount>,
}

impl MountedNodeStore {
    pub(crate) fn new(index: usize, mount: Arc<Mount>) -> Self {
        Self { index, mount }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    /// Whether this is the store of the default mount.
    pub fn is_global(&self) -> bool {
        self.mount.is_default()
    }
}

impl PartialEq for MountedNodeStore {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for MountedNodeStore {}

impl PartialOrd for MountedNodeStore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MountedNodeStore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl Hash for MountedNodeStore {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}
