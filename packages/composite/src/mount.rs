//! The mount table.
//!
//! A [`Mount`] claims parts of the tree for one backing store. Everything not
//! claimed by a named mount belongs to the default mount. A mount claims
//! - the subtrees rooted at its include paths, and
//! - if it supports fragments, every node below one of its fragment paths
//!   whose name contains the mount's fragment marker `oak:mount-<name>`,
//!   together with that node's subtree.

use std::sync::Arc;

use log::debug;
use mosaic_node_store::{Name, Path};

use crate::config::{CompositeConfig, MountConfig};
use crate::path_trie::PathTrie;
use crate::Error;

/// Name of the default mount.
pub const DEFAULT_MOUNT_NAME: &str = "<default>";

const FRAGMENT_PREFIX: &str = "oak:mount-";

/// One entry of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    name: String,
    include_paths: Vec<Path>,
    fragment_paths: Vec<Path>,
    marker: String,
    default: bool,
}

impl Mount {
    fn new(name: String, include_paths: Vec<Path>, fragment_paths: Vec<Path>) -> Self {
        let marker = format!("{}{}", FRAGMENT_PREFIX, name);
        Self {
            name,
            include_paths,
            fragment_paths,
            marker,
            default: false,
        }
    }

    fn default_mount() -> Self {
        Self {
            default: true,
            ..Self::new(DEFAULT_MOUNT_NAME.to_string(), Vec::new(), Vec::new())
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_default(&self) -> bool {
        self.default
    }

    pub fn include_paths(&self) -> &[Path] {
        &self.include_paths
    }

    pub fn fragment_paths(&self) -> &[Path] {
        &self.fragment_paths
    }

    /// Whether `name` is a fragment node name of this mount.
    pub fn is_fragment_name(&self, name: &Name) -> bool {
        !self.fragment_paths.is_empty() && name.contains(self.marker.as_str())
    }

    /// Whether fragments of this mount may appear as children of `path`.
    pub fn supports_fragment(&self, path: &Path) -> bool {
        self.fragment_paths.iter().any(|fp| path.has_prefix(fp))
    }

    /// Whether a fragment path of this mount is `path` or lies below it.
    pub fn supports_fragment_under(&self, path: &Path) -> bool {
        self.fragment_paths.iter().any(|fp| fp.has_prefix(path))
    }

    /// Whether `path` is claimed through a fragment node.
    fn is_fragment_path(&self, path: &Path) -> bool {
        if self.fragment_paths.is_empty() {
            return false;
        }
        path.iter().enumerate().any(|(depth, name)| {
            self.is_fragment_name(name) && self.supports_fragment(&path.slice(0, depth))
        })
    }
}

/// Resolves which mount owns a path.
///
/// # Example
///
/// ```rust
/// use mosaic_composite::MountInfoProvider;
/// use mosaic_node_store::path;
///
/// let mip = MountInfoProvider::builder()
///     .mount("libs", &["/libs", "/apps"])
///     .build()
///     .unwrap();
///
/// assert_eq!(mip.mount_by_path(&path!("/libs/a")).name(), "libs");
/// assert!(mip.mount_by_path(&path!("/content")).is_default());
/// ```
#[derive(Debug, Clone)]
pub struct MountInfoProvider {
    default_mount: Arc<Mount>,
    mounts: Vec<Arc<Mount>>,
    /// Include paths, mapped to an index into `mounts`.
    include_trie: PathTrie<usize>,
}

impl MountInfoProvider {
    /// A provider with only the default mount.
    pub fn default_provider() -> Self {
        Self {
            default_mount: Arc::new(Mount::default_mount()),
            mounts: Vec::new(),
            include_trie: PathTrie::new(),
        }
    }

    pub fn builder() -> MountInfoProviderBuilder {
        MountInfoProviderBuilder::default()
    }

    /// Build a provider from a parsed configuration.
    pub fn from_config(config: &CompositeConfig) -> Result<Self, Error> {
        let mut builder = Self::builder();
        builder.mounts = config.mounts.clone();
        builder.build()
    }

    pub fn default_mount(&self) -> &Arc<Mount> {
        &self.default_mount
    }

    /// Named mounts, in registration order.
    pub fn non_default_mounts(&self) -> &[Arc<Mount>] {
        &self.mounts
    }

    pub fn has_non_default_mounts(&self) -> bool {
        !self.mounts.is_empty()
    }

    pub fn mount_by_name(&self, name: &str) -> Option<&Arc<Mount>> {
        if name == DEFAULT_MOUNT_NAME {
            return Some(&self.default_mount);
        }
        self.mounts.iter().find(|m| m.name() == name)
    }

    /// The mount owning `path`: a fragment match first, then the mount with
    /// the deepest include path at or above `path`, else the default mount.
    pub fn mount_by_path(&self, path: &Path) -> &Arc<Mount> {
        if let Some(mount) = self.mounts.iter().find(|m| m.is_fragment_path(path)) {
            return mount;
        }
        self.include_trie
            .find_ancestor(path)
            .and_then(|(index, _)| self.mounts.get(*index))
            .unwrap_or(&self.default_mount)
    }

    /// Mounts with an include path strictly below `path`.
    pub fn mounts_placed_under(&self, path: &Path) -> Vec<&Arc<Mount>> {
        self.placed_under(path, |relative| !relative.is_root())
    }

    /// Mounts with an include path that is a child of `path`.
    pub fn mounts_placed_directly_under(&self, path: &Path) -> Vec<&Arc<Mount>> {
        self.placed_under(path, |relative| relative.len() == 1)
    }

    fn placed_under(&self, path: &Path, keep: impl Fn(&Path) -> bool) -> Vec<&Arc<Mount>> {
        let Some(subtrie) = self.include_trie.get_subtrie(path) else {
            return Vec::new();
        };
        let mut indexes: Vec<usize> = subtrie
            .iter()
            .filter(|(relative, _)| keep(relative))
            .map(|(_, index)| *index)
            .collect();
        indexes.sort_unstable();
        indexes.dedup();
        indexes
            .into_iter()
            .filter_map(|index| self.mounts.get(index))
            .collect()
    }
}

impl Default for MountInfoProvider {
    fn default() -> Self {
        Self::default_provider()
    }
}

/// Builder for [`MountInfoProvider`].
#[derive(Debug, Default)]
pub struct MountInfoProviderBuilder {
    mounts: Vec<MountConfig>,
}

impl MountInfoProviderBuilder {
    /// Add a mount owning the subtrees at `paths`.
    pub fn mount(mut self, name: impl Into<String>, paths: &[&str]) -> Self {
        self.mounts.push(MountConfig::new(name, paths));
        self
    }

    /// Add a mount that also owns fragment nodes below `fragment_paths`.
    pub fn mount_with_fragments(
        mut self,
        name: impl Into<String>,
        paths: &[&str],
        fragment_paths: &[&str],
    ) -> Self {
        self.mounts
            .push(MountConfig::new(name, paths).with_fragment_paths(fragment_paths));
        self
    }

    /// Validate the mounts and build the provider.
    ///
    /// # Errors
    ///
    /// - [`Error::Store`] if a path does not parse
    /// - [`Error::InvalidMount`] for an empty, reserved or duplicate mount
    ///   name, a mount of the root path, or include paths of two mounts that
    ///   overlap
    pub fn build(self) -> Result<MountInfoProvider, Error> {
        let mut provider = MountInfoProvider::default_provider();

        for config in self.mounts {
            if config.name.is_empty() || config.name == DEFAULT_MOUNT_NAME {
                return Err(Error::InvalidMount {
                    message: format!("invalid mount name '{}'", config.name),
                });
            }
            if provider.mount_by_name(&config.name).is_some() {
                return Err(Error::InvalidMount {
                    message: format!("duplicate mount name '{}'", config.name),
                });
            }

            let include_paths = parse_paths(&config.paths)?;
            let fragment_paths = parse_paths(&config.fragment_paths)?;
            let index = provider.mounts.len();

            for path in &include_paths {
                if path.is_root() {
                    return Err(Error::InvalidMount {
                        message: format!("mount '{}' cannot include the root", config.name),
                    });
                }
                check_overlap(&provider, &config.name, index, path)?;
                provider.include_trie.insert(path, index);
            }

            debug!(
                "mount '{}' includes {:?}, fragments below {:?}",
                config.name, config.paths, config.fragment_paths
            );
            provider
                .mounts
                .push(Arc::new(Mount::new(config.name, include_paths, fragment_paths)));
        }

        Ok(provider)
    }
}

fn parse_paths(paths: &[String]) -> Result<Vec<Path>, Error> {
    paths
        .iter()
        .map(|p| Path::parse(p).map_err(Error::from))
        .collect()
}

/// Reject `path` if it overlaps an include path of another mount.
fn check_overlap(
    provider: &MountInfoProvider,
    name: &str,
    index: usize,
    path: &Path,
) -> Result<(), Error> {
    let above = provider.include_trie.find_ancestor(path).map(|(i, _)| *i);
    let below = provider
        .include_trie
        .get_subtrie(path)
        .into_iter()
        .flat_map(|sub| sub.iter().map(|(_, i)| *i))
        .find(|i| *i != index);

    match above.filter(|i| *i != index).or(below) {
        Some(other) => {
            let other = provider
                .mounts
                .get(other)
                .map_or(DEFAULT_MOUNT_NAME, |m| m.name());
            Err(Error::InvalidMount {
                message: format!(
                    "path {} of mount '{}' overlaps mount '{}'",
                    path, name, other
                ),
            })
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_node_store::{name, path};

    fn provider() -> MountInfoProvider {
        MountInfoProvider::builder()
            .mount("libs", &["/libs", "/apps"])
            .mount_with_fragments("frag", &["/deep/under/frag"], &["/content"])
            .build()
            .unwrap()
    }

    #[test]
    fn default_provider_owns_everything() {
        let mip = MountInfoProvider::default();
        assert!(!mip.has_non_default_mounts());
        assert!(mip.mount_by_path(&path!("/any/path")).is_default());
        assert!(mip.mount_by_path(&Path::root()).is_default());
    }

    #[test]
    fn include_paths_own_subtrees() {
        let mip = provider();
        assert_eq!(mip.mount_by_path(&path!("/libs")).name(), "libs");
        assert_eq!(mip.mount_by_path(&path!("/apps/x/y")).name(), "libs");
        assert!(mip.mount_by_path(&path!("/libsx")).is_default());
        assert!(mip.mount_by_path(&path!("/")).is_default());
    }

    #[test]
    fn fragment_nodes_belong_to_mount() {
        let mip = provider();
        assert_eq!(
            mip.mount_by_path(&path!("/content/oak:mount-frag-index")).name(),
            "frag"
        );
        assert_eq!(
            mip.mount_by_path(&path!("/content/a/oak:mount-frag/child")).name(),
            "frag"
        );
        // Outside the fragment paths the marker means nothing.
        assert!(mip
            .mount_by_path(&path!("/other/oak:mount-frag"))
            .is_default());
        assert!(mip.mount_by_path(&path!("/content/plain")).is_default());
    }

    #[test]
    fn fragment_support_queries() {
        let mip = provider();
        let frag = mip.mount_by_name("frag").unwrap();
        let libs = mip.mount_by_name("libs").unwrap();

        assert!(frag.supports_fragment(&path!("/content")));
        assert!(frag.supports_fragment(&path!("/content/a")));
        assert!(!frag.supports_fragment(&Path::root()));
        assert!(frag.supports_fragment_under(&Path::root()));
        assert!(!frag.supports_fragment_under(&path!("/content/a")));
        assert!(frag.is_fragment_name(&name!("x-oak:mount-frag")));
        assert!(!libs.is_fragment_name(&name!("oak:mount-libs")));
    }

    #[test]
    fn placement_queries() {
        let mip = provider();
        fn names(mounts: Vec<&Arc<Mount>>) -> Vec<String> {
            mounts.iter().map(|m| m.name().to_string()).collect()
        }
        assert_eq!(names(mip.mounts_placed_under(&Path::root())), vec!["libs", "frag"]);
        assert_eq!(names(mip.mounts_placed_directly_under(&Path::root())), vec!["libs"]);
        assert_eq!(names(mip.mounts_placed_under(&path!("/deep"))), vec!["frag"]);
        assert!(mip.mounts_placed_under(&path!("/libs")).is_empty());
        assert!(mip.mounts_placed_under(&path!("/nowhere")).is_empty());
        assert_eq!(
            names(mip.mounts_placed_directly_under(&path!("/deep/under"))),
            vec!["frag"]
        );
        assert!(mip.mounts_placed_directly_under(&path!("/deep")).is_empty());
        assert!(mip.mounts_placed_under(&path!("/deep/under/frag")).is_empty());
    }

    #[test]
    fn overlapping_mounts_are_rejected() {
        let nested = MountInfoProvider::builder()
            .mount("a", &["/x"])
            .mount("b", &["/x/y"])
            .build();
        assert!(matches!(nested, Err(Error::InvalidMount { .. })));

        let enclosing = MountInfoProvider::builder()
            .mount("a", &["/x/y"])
            .mount("b", &["/x"])
            .build();
        assert!(matches!(enclosing, Err(Error::InvalidMount { .. })));

        let siblings = MountInfoProvider::builder()
            .mount("a", &["/x/y"])
            .mount("b", &["/x/z"])
            .build();
        assert!(siblings.is_ok());
    }

    #[test]
    fn invalid_names_are_rejected() {
        for name in ["", DEFAULT_MOUNT_NAME] {
            let result = MountInfoProvider::builder().mount(name, &["/x"]).build();
            assert!(matches!(result, Err(Error::InvalidMount { .. })));
        }
        let duplicate = MountInfoProvider::builder()
            .mount("a", &["/x"])
            .mount("a", &["/y"])
            .build();
        assert!(matches!(duplicate, Err(Error::InvalidMount { .. })));
    }

    #[test]
    fn root_mount_and_bad_paths_are_rejected() {
        let root = MountInfoProvider::builder().mount("a", &["/"]).build();
        assert!(matches!(root, Err(Error::InvalidMount { .. })));

        let bad = MountInfoProvider::builder().mount("a", &["/x*"]).build();
        assert!(matches!(bad, Err(Error::Store(_))));
    }

    #[test]
    fn from_config() {
        let config = CompositeConfig::from_json(
            r#"{"mounts": [{"name": "libs", "paths": ["/libs"], "fragmentPaths": ["/content"]}]}"#,
        )
        .unwrap();
        let mip = MountInfoProvider::from_config(&config).unwrap();
        let libs = mip.mount_by_name("libs").unwrap();
        assert_eq!(libs.include_paths(), &[path!("/libs")]);
        assert_eq!(libs.fragment_paths(), &[path!("/content")]);
        assert!(mip.mount_by_name(DEFAULT_MOUNT_NAME).unwrap().is_default());
    }
}
