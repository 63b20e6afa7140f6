//! Immutable binary property content.

use std::fmt;
use std::io::Read;

use bytes::{Buf, Bytes};

/// Binary content stored in a property.
///
/// Blobs are immutable and cheap to clone: the content is reference counted
/// and shared between clones.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Blob {
    content: Bytes,
}

impl Blob {
    /// Create a blob from in-memory content.
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Create a blob by draining a byte stream.
    pub fn from_reader(reader: &mut dyn Read) -> std::io::Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(Self::new(buf))
    }

    /// Length of the content in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// True if the blob has no content.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// The content.
    pub fn bytes(&self) -> &Bytes {
        &self.content
    }

    /// A fresh reader over the content.
    pub fn reader(&self) -> impl Read {
        self.content.clone().reader()
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({} bytes)", self.content.len())
    }
}
