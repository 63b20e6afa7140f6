//! Error types for the composition layer.

use mosaic_node_store::PathError;

/// Errors raised while assembling or operating a composite store.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An error from a backing store or its primitives.
    #[error("store error: {0}")]
    Store(#[from] mosaic_node_store::Error),

    /// The mount configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The mount configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The mount table is inconsistent.
    #[error("invalid mount: {message}")]
    InvalidMount { message: String },

    /// A mount has no backing store.
    #[error("no store registered for mount '{mount}'")]
    MissingStore { mount: String },
}

impl From<PathError> for Error {
    fn from(e: PathError) -> Self {
        Error::Store(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_mount_display() {
        let e = Error::InvalidMount {
            message: "overlapping paths".to_string(),
        };
        assert_eq!(e.to_string(), "invalid mount: overlapping paths");
    }

    #[test]
    fn missing_store_display() {
        let e = Error::MissingStore {
            mount: "libs".to_string(),
        };
        assert!(e.to_string().contains("'libs'"));
    }

    #[test]
    fn path_error_is_wrapped() {
        let e: Error = PathError::InvalidPath {
            message: "bad".to_string(),
        }
        .into();
        assert!(matches!(
            e,
            Error::Store(mosaic_node_store::Error::Path(_))
        ));
    }

    #[test]
    fn config_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: Error = json_err.into();
        assert!(e.to_string().starts_with("invalid configuration"));
    }
}
