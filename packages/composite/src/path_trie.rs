//! A prefix trie keyed by node names.
//!
//! `PathTrie<T>` answers "which value is registered at the deepest ancestor
//! of this path" in O(k), k being the path depth. The mount table uses it to
//! resolve include paths.

use std::collections::BTreeMap;

use mosaic_node_store::{Name, Path};

/// A prefix trie keyed by path elements.
///
/// # Example
///
/// ```rust
/// use mosaic_composite::PathTrie;
/// use mosaic_node_store::path;
///
/// let mut trie: PathTrie<&str> = PathTrie::new();
/// trie.insert(&path!("/libs"), "libs");
/// trie.insert(&path!("/libs/vendor"), "vendor");
///
/// let (value, suffix) = trie.find_ancestor(&path!("/libs/vendor/x")).unwrap();
/// assert_eq!(*value, "vendor");
/// assert_eq!(suffix, path!("/x"));
/// ```
#[derive(Debug, Clone)]
pub struct PathTrie<T> {
    value: Option<T>,
    children: BTreeMap<Name, PathTrie<T>>,
}

impl<T> Default for PathTrie<T> {
    fn default() -> Self {
        Self {
            value: None,
            children: BTreeMap::new(),
        }
    }
}

impl<T> PathTrie<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_node(&self, path: &Path) -> Option<&PathTrie<T>> {
        let mut current = self;
        for name in path.iter() {
            current = current.children.get(name)?;
        }
        Some(current)
    }

    /// Insert a value at path. Returns the previous value if any.
    pub fn insert(&mut self, path: &Path, value: T) -> Option<T> {
        let mut current = self;
        for name in path.iter() {
            current = current.children.entry(name.clone()).or_default();
        }
        current.value.replace(value)
    }

    /// Value at exact path.
    pub fn get(&self, path: &Path) -> Option<&T> {
        self.get_node(path)?.value.as_ref()
    }

    /// The subtrie rooted at path.
    pub fn get_subtrie(&self, path: &Path) -> Option<&PathTrie<T>> {
        self.get_node(path)
    }

    /// Count of values in the trie (not nodes).
    pub fn len(&self) -> usize {
        let own = usize::from(self.value.is_some());
        own + self.children.values().map(PathTrie::len).sum::<usize>()
    }

    /// True if no values anywhere in trie.
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.values().all(PathTrie::is_empty)
    }

    /// Find the deepest ancestor-or-self of `path` holding a value.
    /// Returns the value and the remaining suffix of `path`.
    pub fn find_ancestor(&self, path: &Path) -> Option<(&T, Path)> {
        let mut current = self;
        let mut last_value = self.value.as_ref();
        let mut last_depth = 0;

        for (depth, name) in path.iter().enumerate() {
            match current.children.get(name) {
                Some(child) => {
                    current = child;
                    if child.value.is_some() {
                        last_value = child.value.as_ref();
                        last_depth = depth + 1;
                    }
                }
                None => break,
            }
        }

        last_value.map(|v| (v, path.slice(last_depth, path.len())))
    }

    /// Iterate over all (path, value) pairs, paths relative to this trie.
    pub fn iter(&self) -> PathTrieIter<'_, T> {
        PathTrieIter {
            stack: vec![(Vec::new(), self)],
        }
    }
}

/// Iterator over (Path, &T) pairs in a PathTrie, in name order.
pub struct PathTrieIter<'a, T> {
    stack: Vec<(Vec<Name>, &'a PathTrie<T>)>,
}

impl<'a, T> Iterator for PathTrieIter<'a, T> {
    type Item = (Path, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((elements, node)) = self.stack.pop() {
            for (name, child) in node.children.iter().rev() {
                let mut child_elements = elements.clone();
                child_elements.push(name.clone());
                self.stack.push((child_elements, child));
            }
            if let Some(value) = &node.value {
                return Some((Path::from_names(elements), value));
            }
        }
        None
    }
}
