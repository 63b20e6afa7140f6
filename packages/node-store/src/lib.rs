//! Mosaic node store: per-store tree primitives
//!
//! This layer defines what a single backing store offers to the composite
//! layer above it:
//! - `Path` / `Name`: Validated tree addresses
//! - `Value` / `PropertyState`: Typed node properties
//! - `NodeState`: Immutable, shareable node snapshots
//! - `NodeBuilder`: Mutable node handles of a write session
//! - `NodeStore`: A backing store handing out snapshots and builders
//!
//! `MemoryNodeStore` is the in-memory implementation used as backing store
//! for tests and for small trees.
//!
//! # Example
//!
//! ```rust
//! use mosaic_node_store::{MemoryNodeStore, NodeBuilder, NodeStore, PropertyState, name};
//!
//! let store = MemoryNodeStore::new();
//! let root = store.builder();
//! root.child(&name!("content"))
//!     .unwrap()
//!     .set_property(PropertyState::new("title", "Hello").unwrap())
//!     .unwrap();
//! store.merge(&root).unwrap();
//!
//! let content = store.root().child_node(&name!("content"));
//! assert_eq!(content.get_string("title"), Some("Hello".to_string()));
//! ```

pub use bytes::Bytes;

mod blob;
mod builder;
mod error;
mod memory;
mod path;
pub mod provenance;
mod state;
mod store;
mod value;

pub use blob::Blob;
pub use builder::NodeBuilder;
pub use error::Error;
pub use memory::{MemoryNodeBuilder, MemoryNodeStore};
pub use path::{Name, Path, PathError};
pub use state::{
    accumulate_child_sizes, empty_node, missing_node, node_states_equal, ChildCount,
    MemoryNodeState, MissingNodeState, NodeState, NodeStateRef, EMPTY_NODE, MISSING_NODE,
    UNBOUNDED_CHILD_COUNT,
};
pub use store::{BlobStore, NodeStore};
pub use value::{PropertyState, Value};
