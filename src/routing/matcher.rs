//! Mount point matching.
//!
//! # Responsibilities
//! - Decide whether a request path lies under the configured mount point
//! - Return the part of the path below the mount point
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Matching is segment-aware: `/passthroughX` is not under `/passthrough`
//! - No regex to guarantee O(n) matching

/// A path prefix under which requests are forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    /// Normalized prefix; empty means the root mount.
    prefix: String,
}

impl MountPoint {
    /// Create a mount point. Trailing slashes are ignored, so `/` and `""`
    /// both mount at the root.
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            prefix: path.as_ref().trim_end_matches('/').to_string(),
        }
    }

    /// The normalized prefix (`""` for the root mount).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if the path lies under this mount point.
    pub fn matches(&self, path: &str) -> bool {
        self.strip(path).is_some()
    }

    /// Strip the mount point from `path`.
    ///
    /// Returns the remainder (empty, or starting with `/`) when `path` is under
    /// the mount point, `None` otherwise.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

impl std::fmt::Display for MountPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.prefix.is_empty() {
            f.write_str("/")
        } else {
            f.write_str(&self.prefix)
        }
    }
}
