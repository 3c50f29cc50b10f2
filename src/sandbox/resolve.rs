//! Path canonicalization for the sandbox guard.
//!
//! `std::fs::canonicalize` fails for paths that do not exist yet, which is
//! exactly what `mkdir`, `touch`, `mv` and `cp` produce. Resolution here walks
//! the path one component at a time instead: components that exist are
//! resolved through the filesystem (following symlinks, dangling or not),
//! components that do not exist are appended lexically.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Maximum number of symlinks expanded while resolving one path.
pub const MAX_SYMLINK_HOPS: usize = 40;

/// Whether the final path component is resolved when it is a symlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowMode {
    /// Resolve every component, including the last.
    #[default]
    Follow,
    /// Keep a final plain name as-is so the link itself is the operand.
    NoFollowFinal,
}

/// A canonical absolute path that has passed the sandbox check.
///
/// Only [`SandboxRoot`](super::SandboxRoot) constructs these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    pub(super) fn new_unchecked(path: PathBuf) -> Self {
        Self(path)
    }

    /// Returns the underlying host path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Returns the final component name, if any.
    pub fn file_name(&self) -> Option<&std::ffi::OsStr> {
        self.0.file_name()
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Symlink expansion exceeded [`MAX_SYMLINK_HOPS`].
#[derive(Debug)]
pub(super) struct SymlinkLoop;

enum Step {
    Prefix(OsString),
    RootDir,
    Current,
    Parent,
    Name(OsString),
}

fn steps(path: &Path) -> impl DoubleEndedIterator<Item = Step> + '_ {
    path.components().map(|c| match c {
        Component::Prefix(p) => Step::Prefix(p.as_os_str().to_os_string()),
        Component::RootDir => Step::RootDir,
        Component::CurDir => Step::Current,
        Component::ParentDir => Step::Parent,
        Component::Normal(name) => Step::Name(name.to_os_string()),
    })
}

fn reset_to_root(resolved: &Path) -> PathBuf {
    let mut base = PathBuf::new();
    if let Some(Component::Prefix(p)) = resolved.components().next() {
        base.push(p.as_os_str());
    }
    base.push(Component::RootDir.as_os_str());
    base
}

/// Resolves `input` against `cwd`, starting the walk at `root`.
///
/// The working directory is re-walked from the root on every call rather than
/// trusted, so a directory swapped for a symlink after a `cd` is still caught.
/// The result contains no `.`/`..` components and no symlinks, except a final
/// symlink under [`FollowMode::NoFollowFinal`]. Containment is not checked.
pub(super) fn resolve_within(
    root: &Path,
    cwd: &Path,
    input: &Path,
    mode: FollowMode,
) -> Result<PathBuf, SymlinkLoop> {
    let mut resolved = root.to_path_buf();
    let mut queue: VecDeque<Step> = match cwd.strip_prefix(root) {
        Ok(rel) => steps(rel).collect(),
        Err(_) => steps(cwd).collect(),
    };
    queue.extend(steps(input));

    let mut hops = 0;
    while let Some(step) = queue.pop_front() {
        match step {
            Step::Prefix(prefix) => resolved = PathBuf::from(prefix),
            Step::RootDir => resolved = reset_to_root(&resolved),
            Step::Current => {}
            Step::Parent => {
                resolved.pop();
            }
            Step::Name(name) => {
                let candidate = resolved.join(&name);
                if queue.is_empty() && mode == FollowMode::NoFollowFinal {
                    resolved = candidate;
                    continue;
                }

                let is_link = std::fs::symlink_metadata(&candidate)
                    .map(|meta| meta.file_type().is_symlink())
                    .unwrap_or(false);
                if !is_link {
                    resolved = candidate;
                    continue;
                }

                hops += 1;
                if hops > MAX_SYMLINK_HOPS {
                    return Err(SymlinkLoop);
                }
                match std::fs::read_link(&candidate) {
                    // The link target replaces the link; `resolved` stays at the
                    // link's parent so relative targets expand from there.
                    Ok(target) => {
                        for step in steps(&target).rev() {
                            queue.push_front(step);
                        }
                    }
                    Err(_) => resolved = candidate,
                }
            }
        }
    }

    Ok(resolved)
}
