//! Move provenance tracking.
//!
//! When a node is moved, the node at its new location is annotated with the
//! path it was moved from, stored in the reserved [`SOURCE_PATH`] property.
//! An annotation counts only if it was written during the current session,
//! which is detected by comparing the property in the base and head states.
//!
//! The walk is expressed purely in terms of [`NodeBuilder`], so it works the
//! same for a single store and for a tree spread over several stores.

use crate::{Error, NodeBuilder, NodeStateRef, Path, PropertyState};

/// Reserved property recording the path a node was moved from.
pub const SOURCE_PATH: &str = ":source-path";

/// The annotation written on `builder` during the current session, if any.
///
/// Unchanged annotations come from an earlier session and are ignored.
pub fn source_path_annotation<B: NodeBuilder>(builder: &B) -> Option<String> {
    let base = builder.base_state().property(SOURCE_PATH);
    let head = builder.property(SOURCE_PATH);
    if base == head {
        return None;
    }
    head.and_then(|p| p.value().as_str().map(str::to_string))
}

/// Put back the annotation `builder` carried before a move was attempted.
pub fn restore_annotation<B: NodeBuilder>(
    builder: &B,
    previous: Option<PropertyState>,
) -> Result<(), Error> {
    match previous {
        Some(property) => builder.set_property(property).map(|_| ()),
        None => builder.remove_property(SOURCE_PATH).map(|_| ()),
    }
}

/// Resolve the path that the node at `path` had when the session started.
///
/// Walks from `root` down to `path`. The deepest node along the way carrying
/// a fresh annotation determines the result: its annotated source path with
/// the remaining elements of `path` appended. Without any annotation the
/// node has not moved and `path` is returned.
///
/// # Errors
///
/// [`Error::Path`] if an annotation does not hold a valid path.
pub fn source_path<B: NodeBuilder>(root: &B, path: &Path) -> Result<Path, Error> {
    let mut found: Option<(String, usize)> = None;
    let mut builder = root.clone();
    for depth in 0..=path.len() {
        if let Some(source) = source_path_annotation(&builder) {
            found = Some((source, depth));
        }
        if depth == path.len() {
            break;
        }
        builder = builder.get_child_node(&path[depth]);
    }

    match found {
        None => Ok(path.clone()),
        Some((source, depth)) => {
            let source = Path::parse(&source)?;
            Ok(source.join(&path.slice(depth, path.len())))
        }
    }
}

/// Whether `path` is absent from the persisted state rooted at `base_root`,
/// i.e. the node at `path` was created during the current session.
pub fn is_transiently_added(base_root: NodeStateRef, path: &Path) -> bool {
    let mut node = base_root;
    for name in path.iter() {
        node = node.child_node(name);
    }
    !node.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{name, path, MemoryNodeState, MemoryNodeStore, NodeStore, PropertyState};
    use std::sync::Arc;

    fn store_with(paths: &[&str]) -> MemoryNodeStore {
        let store = MemoryNodeStore::new();
        let root = store.builder();
        for p in paths {
            let mut builder = root.clone();
            for element in path!(p).iter() {
                builder = builder.child(element).unwrap();
            }
        }
        store.merge(&root).unwrap();
        store
    }

    #[test]
    fn unannotated_path_is_its_own_source() {
        let store = store_with(&["/a/b/c"]);
        let root = store.builder();
        assert_eq!(source_path(&root, &path!("/a/b/c")).unwrap(), path!("/a/b/c"));
    }

    #[test]
    fn fresh_annotation_on_ancestor_is_extended() {
        let store = store_with(&["/x/y"]);
        let root = store.builder();
        let x = root.get_child_node(&name!("x"));
        x.set_property(PropertyState::new(SOURCE_PATH, "/old/place").unwrap())
            .unwrap();

        assert_eq!(
            source_path(&root, &path!("/x/y")).unwrap(),
            path!("/old/place/y")
        );
    }

    #[test]
    fn deepest_annotation_wins() {
        let store = store_with(&["/x/y/z"]);
        let root = store.builder();
        let x = root.get_child_node(&name!("x"));
        let y = x.get_child_node(&name!("y"));
        x.set_property(PropertyState::new(SOURCE_PATH, "/first").unwrap())
            .unwrap();
        y.set_property(PropertyState::new(SOURCE_PATH, "/second").unwrap())
            .unwrap();

        assert_eq!(
            source_path(&root, &path!("/x/y/z")).unwrap(),
            path!("/second/z")
        );
    }

    #[test]
    fn persisted_annotation_is_ignored() {
        let store = store_with(&["/x"]);
        let setup = store.builder();
        setup
            .get_child_node(&name!("x"))
            .set_property(PropertyState::new(SOURCE_PATH, "/before").unwrap())
            .unwrap();
        store.merge(&setup).unwrap();

        let root = store.builder();
        assert_eq!(source_path_annotation(&root.get_child_node(&name!("x"))), None);
        assert_eq!(source_path(&root, &path!("/x")).unwrap(), path!("/x"));
    }

    #[test]
    fn invalid_annotation_is_an_error() {
        let store = store_with(&["/x"]);
        let root = store.builder();
        root.get_child_node(&name!("x"))
            .set_property(PropertyState::new(SOURCE_PATH, "/bad*name").unwrap())
            .unwrap();
        assert!(source_path(&root, &path!("/x")).is_err());
    }

    #[test]
    fn restore_puts_back_previous_annotation() {
        let store = store_with(&["/x", "/y"]);
        let root = store.builder();
        let x = root.get_child_node(&name!("x"));
        let y = root.get_child_node(&name!("y"));
        let earlier = PropertyState::new(SOURCE_PATH, "/earlier").unwrap();
        y.set_property(earlier.clone()).unwrap();

        x.set_property(PropertyState::new(SOURCE_PATH, "/x").unwrap())
            .unwrap();
        restore_annotation(&x, None).unwrap();
        assert!(!x.has_property(SOURCE_PATH));

        y.set_property(PropertyState::new(SOURCE_PATH, "/y").unwrap())
            .unwrap();
        restore_annotation(&y, Some(earlier.clone())).unwrap();
        assert_eq!(y.property(SOURCE_PATH), Some(earlier));
    }

    #[test]
    fn transient_detection() {
        let base: NodeStateRef = Arc::new(MemoryNodeState::new().with_child(
            name!("a"),
            MemoryNodeState::new().with_child(name!("b"), MemoryNodeState::new()),
        ));
        assert!(!is_transiently_added(base.clone(), &path!("/")));
        assert!(!is_transiently_added(base.clone(), &path!("/a/b")));
        assert!(is_transiently_added(base.clone(), &path!("/a/c")));
        assert!(is_transiently_added(base, &path!("/new")));
    }
}
