//! Mosaic composite: one tree over several mounted stores
//!
//! This layer presents a single tree whose subtrees live in different
//! backing stores, selected purely by path:
//! - `MountInfoProvider`: Which mount owns which path
//! - `CompositionContext`: Routing of reads and writes to stores
//! - `NodeMap`: Per-store values with lazy, memoized transforms
//! - `CompositeNodeBuilder`: The mutable composite node handle
//! - `CompositeNodeState`: The read-only composite snapshot
//! - `CompositeNodeStore`: Assembly from a mount table and stores
//!
//! # Example
//!
//! ```rust
//! use mosaic_composite::{CompositeNodeStore, MountInfoProvider};
//! use mosaic_node_store::{name, path, MemoryNodeStore, NodeBuilder};
//!
//! let mip = MountInfoProvider::builder()
//!     .mount("site", &["/content/site/mounted"])
//!     .build()
//!     .unwrap();
//! let store = CompositeNodeStore::configure(mip, MemoryNodeStore::new())
//!     .add_mount("site", MemoryNodeStore::new())
//!     .build()
//!     .unwrap();
//!
//! let root = store.root_builder();
//! let site = root
//!     .child(&name!("content"))
//!     .and_then(|content| content.child(&name!("site")))
//!     .unwrap();
//! let mounted = site.child(&name!("mounted")).unwrap();
//! assert!(mounted.exists());
//! assert_eq!(root.source_path().unwrap(), path!("/"));
//! ```

mod builder;
mod config;
mod context;
mod error;
mod handle;
mod mount;
mod mounted;
mod node_map;
mod path_trie;
mod state;
mod store;

pub use builder::CompositeNodeBuilder;
pub use config::{CompositeConfig, MountConfig};
pub use context::CompositionContext;
pub use error::Error;
pub use handle::NodeHandle;
pub use mount::{Mount, MountInfoProvider, MountInfoProviderBuilder, DEFAULT_MOUNT_NAME};
pub use mounted::MountedNodeStore;
pub use node_map::NodeMap;
pub use path_trie::{PathTrie, PathTrieIter};
pub use state::CompositeNodeState;
pub use store::{CompositeNodeStore, CompositeNodeStoreBuilder};
