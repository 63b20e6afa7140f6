//! Backing store traits.

use std::io::Read;

use crate::{Blob, Error, NodeBuilder, NodeStateRef};

/// Creates blobs for a store.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn BlobStore>`.
pub trait BlobStore: Send + Sync {
    /// Create a blob from a byte stream.
    fn create_blob(&self, reader: &mut dyn Read) -> Result<Blob, Error>;
}

/// A backing store holding one tree.
pub trait NodeStore: BlobStore {
    /// The builder type handed out for write sessions.
    type Builder: NodeBuilder;

    /// Snapshot of the current root.
    fn root(&self) -> NodeStateRef;

    /// Start a write session over the current root, returning its root builder.
    fn builder(&self) -> Self::Builder;
}
