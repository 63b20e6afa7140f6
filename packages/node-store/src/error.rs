//! Error types for the node store layer.

use crate::path::{Path, PathError};

/// Errors raised by node states, builders and stores.
///
/// Only precondition violations and I/O failures are errors. Routine
/// outcomes such as a rejected move or removing a missing node are
/// reported through return values instead.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid node name, property name or path.
    #[error("path error: {0}")]
    Path(#[from] PathError),

    /// A write was attempted through a builder whose node does not exist.
    #[error("node does not exist: {path}")]
    NodeNotFound { path: Path },

    /// Only a builder for the root node can be merged into its store.
    #[error("not a root builder: {path}")]
    NotRootBuilder { path: Path },

    /// Reading a blob stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use std::error::Error as StdError;

    #[test]
    fn node_not_found_display() {
        let e = Error::NodeNotFound {
            path: path!("/content/a"),
        };
        assert_eq!(e.to_string(), "node does not exist: /content/a");
    }

    #[test]
    fn not_root_builder_display() {
        let e = Error::NotRootBuilder { path: path!("/a") };
        assert!(e.to_string().contains("not a root builder"));
    }

    #[test]
    fn path_error_conversion() {
        let path_err = PathError::InvalidPath {
            message: "test".to_string(),
        };
        let e: Error = path_err.into();
        assert!(matches!(e, Error::Path(_)));
        assert!(StdError::source(&e).is_some());
        assert!(e.to_string().contains("path error"));
    }

    #[test]
    fn io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let e: Error = io.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("short read"));
    }
}
