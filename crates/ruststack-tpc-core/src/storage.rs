//! Storage areas and logical path resolution.
//!
//! A storage area maps a mount prefix (`/<name>`) onto a directory of the local
//! filesystem. Logical paths such as `/sa1/dir/file` are what HTTP clients see;
//! [`PathResolver`] turns them into real filesystem paths.
//!
//! Resolution never escapes the storage area root: any `.` or `..` segment
//! makes a logical path unresolvable.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::StorageAreaConfig;
use crate::error::ConfigError;

/// A request path split at its storage area mount point.
///
/// This is the `(mount prefix, extra path)` pair the validator works on:
/// `/sa1/dir/file` becomes `mount_point = "/sa1"`, `path_info = Some("/dir/file")`,
/// while `/sa1` alone has no path info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedPath {
    /// Mount prefix of the matched storage area, e.g. `/sa1`.
    pub mount_point: String,
    /// Remainder of the request path after the mount prefix, if any.
    pub path_info: Option<String>,
}

/// Resolves logical paths against the backing namespace.
///
/// This is the only view of the filesystem the TPC validator has.
pub trait PathResolver: Send + Sync + fmt::Debug + 'static {
    /// Split a decoded request path at the storage area it belongs to.
    ///
    /// Returns `None` when no storage area serves the path.
    fn scope(&self, request_path: &str) -> Option<ScopedPath>;

    /// Map a logical path to a filesystem path, or `None` if it lies outside
    /// every storage area.
    fn resolve_path(&self, logical_path: &str) -> Option<PathBuf>;

    /// Whether the logical path exists in the backing namespace.
    fn path_exists(&self, logical_path: &str) -> bool {
        self.resolve_path(logical_path)
            .is_some_and(|path| path.exists())
    }
}

/// One configured storage area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageArea {
    name: String,
    mount_point: String,
    root: PathBuf,
}

impl StorageArea {
    /// Storage area name (first path segment).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mount prefix, `/<name>`.
    #[must_use]
    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    /// Filesystem root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// The set of storage areas served by this gateway.
#[derive(Debug, Clone, Default)]
pub struct StorageAreas {
    areas: Vec<StorageArea>,
}

impl StorageAreas {
    /// Build the storage areas from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a name is empty or contains `/`, a root is
    /// not an absolute path, or two areas share a name.
    ///
    /// # Examples
    ///
    /// ```
    /// use ruststack_tpc_core::{StorageAreaConfig, StorageAreas};
    ///
    /// let areas = StorageAreas::new(&[StorageAreaConfig::new("sa1", "/data/sa1")]).unwrap();
    /// assert_eq!(areas.len(), 1);
    /// ```
    pub fn new(configs: &[StorageAreaConfig]) -> Result<Self, ConfigError> {
        let mut areas: Vec<StorageArea> = Vec::with_capacity(configs.len());

        for config in configs {
            let name = config.name.trim();
            if name.is_empty() || name.contains('/') || name == "." || name == ".." {
                return Err(ConfigError::InvalidStorageArea {
                    name: config.name.clone(),
                    reason: "name must be a single non-empty path segment".to_owned(),
                });
            }

            let root = PathBuf::from(config.root.trim());
            if !root.is_absolute() {
                return Err(ConfigError::InvalidStorageArea {
                    name: name.to_owned(),
                    reason: format!("root '{}' is not an absolute path", root.display()),
                });
            }

            if areas.iter().any(|a| a.name == name) {
                return Err(ConfigError::DuplicateStorageArea(name.to_owned()));
            }

            debug!(name, root = %root.display(), "registered storage area");
            areas.push(StorageArea {
                name: name.to_owned(),
                mount_point: format!("/{name}"),
                root,
            });
        }

        Ok(Self { areas })
    }

    /// All configured areas.
    #[must_use]
    pub fn areas(&self) -> &[StorageArea] {
        &self.areas
    }

    /// Number of configured areas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Whether no storage area is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    fn find<'a>(&'a self, path: &'a str) -> Option<(&'a StorageArea, &'a str)> {
        self.areas.iter().find_map(|area| {
            let rest = path.strip_prefix(area.mount_point.as_str())?;
            (rest.is_empty() || rest.starts_with('/')).then_some((area, rest))
        })
    }
}

impl PathResolver for StorageAreas {
    fn scope(&self, request_path: &str) -> Option<ScopedPath> {
        let (area, rest) = self.find(request_path)?;
        Some(ScopedPath {
            mount_point: area.mount_point.clone(),
            path_info: (!rest.is_empty()).then(|| rest.to_owned()),
        })
    }

    fn resolve_path(&self, logical_path: &str) -> Option<PathBuf> {
        let (area, rest) = self.find(logical_path)?;

        let mut resolved = area.root.clone();
        for segment in rest.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return None;
            }
            resolved.push(segment);
        }
        Some(resolved)
    }
}

/// Parent of a logical path, `None` for `/`.
///
/// ```
/// use ruststack_tpc_core::storage::logical_parent;
///
/// assert_eq!(logical_parent("/sa1/dir/file"), Some("/sa1/dir"));
/// assert_eq!(logical_parent("/sa1"), Some("/"));
/// assert_eq!(logical_parent("/"), None);
/// ```
#[must_use]
pub fn logical_parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&trimmed[..idx]),
        None => None,
    }
}
