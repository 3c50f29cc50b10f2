//! The sandbox root directory.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::resolve::{resolve_within, FollowMode, ResolvedPath};

/// The canonical directory that confines every filesystem operation.
///
/// Created once at startup and shared read-only afterwards, so it is safe to
/// hand out through an `Arc` to concurrent sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRoot {
    path: PathBuf,
}

impl SandboxRoot {
    /// Opens (and optionally creates) the sandbox root at `path`.
    ///
    /// The stored path is canonical, so symlinked roots such as macOS's
    /// `/tmp` compare correctly against resolved paths.
    pub fn open(path: impl AsRef<Path>, create_if_missing: bool) -> Result<Self> {
        let path = path.as_ref();
        let invalid = |reason: String| Error::InvalidRoot {
            path: path.to_path_buf(),
            reason,
        };

        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(invalid("not a directory".to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && create_if_missing => {
                std::fs::create_dir_all(path).map_err(|e| invalid(e.to_string()))?;
                tracing::info!(root = %path.display(), "created sandbox root");
            }
            Err(e) => return Err(invalid(e.to_string())),
        }

        let path = path.canonicalize().map_err(|e| invalid(e.to_string()))?;
        Ok(Self { path })
    }

    /// Returns the canonical root path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the root itself as a resolved path.
    pub fn as_resolved(&self) -> ResolvedPath {
        ResolvedPath::new_unchecked(self.path.clone())
    }

    /// Returns the parent of `path`, or `None` if `path` is the root.
    pub fn parent_of(&self, path: &ResolvedPath) -> Option<ResolvedPath> {
        if path.as_path() == self.path {
            return None;
        }
        path.as_path()
            .parent()
            .filter(|parent| self.contains(parent))
            .map(|parent| ResolvedPath::new_unchecked(parent.to_path_buf()))
    }

    /// Returns true if `path` equals the root or lies below it.
    ///
    /// The comparison is component-wise: `/srv/box2` is not inside `/srv/box`.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }

    /// Resolves `input` relative to `cwd` and checks it against the root.
    ///
    /// Fails with [`Error::PermissionDenied`] if the canonical result is
    /// outside the root. Nothing on disk is modified.
    pub fn resolve(&self, cwd: &ResolvedPath, input: &str, mode: FollowMode) -> Result<ResolvedPath> {
        let resolved = resolve_within(&self.path, cwd.as_path(), Path::new(input), mode)
            .map_err(|_| {
                Error::InvalidArgument(format!(
                    "{}: too many levels of symbolic links",
                    input
                ))
            })?;

        if !self.contains(&resolved) {
            tracing::warn!(
                requested = %input,
                resolved = %resolved.display(),
                "rejected path outside sandbox root"
            );
            return Err(Error::PermissionDenied(input.to_string()));
        }

        Ok(ResolvedPath::new_unchecked(resolved))
    }

    /// Renders a path inside the root as a virtual path with a leading `/`.
    pub fn virtual_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.path) {
            Ok(rel) if rel.as_os_str().is_empty() => "/".to_string(),
            Ok(rel) => {
                let parts: Vec<_> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                format!("/{}", parts.join("/"))
            }
            Err(_) => path.display().to_string(),
        }
    }
}
