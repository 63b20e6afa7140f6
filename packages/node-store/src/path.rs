//! Node names and absolute paths.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Errors related to name and path parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A node or property name is not valid.
    InvalidName { name: String, message: String },
    /// The path string is invalid.
    InvalidPath { message: String },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::InvalidName { name, message } => {
                write!(f, "invalid name '{}': {}", name, message)
            }
            PathError::InvalidPath { message } => {
                write!(f, "invalid path: {}", message)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// Characters that may never appear in a name.
const RESERVED_CHARS: [char; 5] = ['/', '[', ']', '|', '*'];

/// A validated node or property name.
///
/// Names are non-empty, are neither `.` nor `..`, and contain no path
/// separator, no `[ ] | *` and no control characters. Colons are allowed,
/// so namespaced names like `jcr:content` or `:source-path` are valid.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Name(String);

impl Name {
    /// Validate and wrap a name.
    pub fn new(name: impl Into<String>) -> Result<Self, PathError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Name(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validate a single name.
pub(crate) fn validate_name(name: &str) -> Result<(), PathError> {
    let invalid = |message: &str| PathError::InvalidName {
        name: name.to_string(),
        message: message.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("empty name"));
    }
    if name == "." || name == ".." {
        return Err(invalid("relative names are not allowed"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| RESERVED_CHARS.contains(c) || c.is_control())
    {
        return Err(invalid(&format!("invalid character {:?}", c)));
    }
    Ok(())
}

impl Deref for Name {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl TryFrom<&str> for Name {
    type Error = PathError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Name::new(s)
    }
}

/// A validated absolute path.
///
/// The root path has no elements and displays as `/`. Every other path is a
/// sequence of valid [`Name`]s and displays as `/a/b/c`.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    elements: Vec<Name>,
}

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Path::default()
    }

    /// Parse a path string, validating each element.
    ///
    /// # Path Syntax
    ///
    /// - Elements are separated by `/`
    /// - Empty elements are ignored (normalizes `//`, leading and trailing `/`)
    /// - Each element must be a valid [`Name`]
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mosaic_node_store::Path;
    ///
    /// let path = Path::parse("/content/site/page").unwrap();
    /// assert_eq!(path.len(), 3);
    /// assert_eq!(path.to_string(), "/content/site/page");
    ///
    /// assert!(Path::parse("/").unwrap().is_root());
    /// assert_eq!(Path::parse("/a/b/").unwrap(), Path::parse("a//b").unwrap());
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let elements = s
            .split('/')
            .filter(|e| !e.is_empty())
            .map(Name::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Path { elements })
    }

    /// Create a path from already validated names.
    pub fn from_names(elements: Vec<Name>) -> Self {
        Path { elements }
    }

    /// True for the root path.
    pub fn is_root(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of elements (the depth of the path).
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True for the root path.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The elements of this path, root first.
    pub fn elements(&self) -> &[Name] {
        &self.elements
    }

    /// Iterate over elements.
    pub fn iter(&self) -> impl Iterator<Item = &Name> {
        self.elements.iter()
    }

    /// The last element, or `None` for the root.
    pub fn name(&self) -> Option<&Name> {
        self.elements.last()
    }

    /// The parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            None
        } else {
            Some(self.slice(0, self.len() - 1))
        }
    }

    /// The path of the named child of this path.
    #[must_use]
    pub fn child(&self, name: &Name) -> Path {
        let mut elements = Vec::with_capacity(self.elements.len() + 1);
        elements.extend(self.elements.iter().cloned());
        elements.push(name.clone());
        Path { elements }
    }

    /// Join this path with a relative one.
    #[must_use]
    pub fn join(&self, other: &Path) -> Path {
        let mut elements = self.elements.clone();
        elements.extend(other.elements.iter().cloned());
        Path { elements }
    }

    /// Check whether `prefix` is this path or one of its ancestors.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        prefix.elements.len() <= self.elements.len()
            && prefix.elements == self.elements[..prefix.elements.len()]
    }

    /// Check whether this path is a proper ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.len() < other.len() && other.has_prefix(self)
    }

    /// Strip a prefix from this path, yielding the relative remainder.
    ///
    /// Returns `None` if the prefix doesn't match.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        if self.has_prefix(prefix) {
            Some(self.slice(prefix.len(), self.len()))
        } else {
            None
        }
    }

    /// Get a slice of elements as a new path.
    pub fn slice(&self, start: usize, end: usize) -> Path {
        Path {
            elements: self.elements[start..end].to_vec(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return f.write_str("/");
        }
        for element in &self.elements {
            write!(f, "/{}", element)?;
        }
        Ok(())
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Name;

    fn index(&self, i: usize) -> &Self::Output {
        &self.elements[i]
    }
}

impl std::str::FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

/// Macro for creating paths from literals.
///
/// # Example
///
/// ```rust
/// use mosaic_node_store::path;
///
/// let p = path!("/content/site");
/// assert_eq!(p.len(), 2);
/// ```
#[macro_export]
macro_rules! path {
    ($s:expr) => {
        $crate::Path::parse($s).expect("invalid path literal")
    };
}

/// Macro for creating names from literals.
///
/// # Example
///
/// ```rust
/// use mosaic_node_store::name;
///
/// let n = name!("jcr:content");
/// assert_eq!(n.as_str(), "jcr:content");
/// ```
#[macro_export]
macro_rules! name {
    ($s:expr) => {
        $crate::Name::new($s).expect("invalid name literal")
    };
}
