//! Per-user terminal session.
//!
//! The current working directory lives here rather than in process-global
//! state, so each web client (and the CLI) carries its own.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::sandbox::{FollowMode, ResolvedPath, SandboxRoot};

/// A terminal session: the shared sandbox root plus a working directory.
#[derive(Debug, Clone)]
pub struct Session {
    root: Arc<SandboxRoot>,
    cwd: ResolvedPath,
}

impl Session {
    /// Creates a session whose working directory is the sandbox root.
    pub fn new(root: Arc<SandboxRoot>) -> Self {
        let cwd = root.as_resolved();
        Self { root, cwd }
    }

    /// Returns the sandbox root.
    pub fn root(&self) -> &SandboxRoot {
        &self.root
    }

    /// Returns the current working directory.
    pub fn cwd(&self) -> &ResolvedPath {
        &self.cwd
    }

    /// Resolves a user path, following every symlink.
    pub fn resolve(&self, input: &str) -> Result<ResolvedPath> {
        self.root.resolve(&self.cwd, input, FollowMode::Follow)
    }

    /// Resolves a user path without following a final symlink.
    pub fn resolve_no_follow(&self, input: &str) -> Result<ResolvedPath> {
        self.root.resolve(&self.cwd, input, FollowMode::NoFollowFinal)
    }

    /// Renders a resolved path as a virtual path.
    pub fn display(&self, path: &ResolvedPath) -> String {
        self.root.virtual_path(path.as_path())
    }

    /// Returns the working directory as a virtual path.
    pub fn pwd(&self) -> String {
        self.display(&self.cwd)
    }

    /// Changes the working directory; the target must be a directory.
    pub fn cd(&mut self, input: &str) -> Result<String> {
        let target = self.resolve(input)?;
        let meta = std::fs::metadata(target.as_path())
            .map_err(|e| Error::from_io(self.display(&target), e))?;
        if !meta.is_dir() {
            return Err(Error::NotADirectory(self.display(&target)));
        }
        self.cwd = target;
        Ok(self.pwd())
    }

    /// Returns to the sandbox root.
    pub fn cd_root(&mut self) -> String {
        self.cwd = self.root.as_resolved();
        self.pwd()
    }

    /// Moves the working directory up to its nearest existing ancestor.
    ///
    /// Called after operations that may have deleted or renamed the current
    /// directory. Never moves above the root.
    pub fn repair_cwd(&mut self) {
        let before = self.pwd();
        while !self.cwd.as_path().is_dir() {
            match self.root.parent_of(&self.cwd) {
                Some(parent) => self.cwd = parent,
                None => break,
            }
        }
        let after = self.pwd();
        if after != before {
            tracing::debug!(from = %before, to = %after, "working directory no longer exists");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session() -> (TempDir, Session) {
        let dir = TempDir::new().unwrap();
        let root = SandboxRoot::open(dir.path(), false).unwrap();
        (dir, Session::new(Arc::new(root)))
    }

    #[test]
    fn new_session_starts_at_root() {
        let (_dir, session) = session();
        assert_eq!(session.pwd(), "/");
    }

    #[test]
    fn cd_into_subdirectory_and_back() {
        let (_dir, mut session) = session();
        std::fs::create_dir_all(session.root().path().join("a/b")).unwrap();

        assert_eq!(session.cd("a/b").unwrap(), "/a/b");
        assert_eq!(session.cd("..").unwrap(), "/a");
        assert_eq!(session.cd(".").unwrap(), "/a");
    }

    #[test]
    fn cd_parent_from_root_is_denied_and_cwd_unchanged() {
        let (_dir, mut session) = session();

        for _ in 0..5 {
            let err = session.cd("..").unwrap_err();
            assert!(matches!(err, Error::PermissionDenied(_)));
            assert_eq!(session.pwd(), "/");
        }
    }

    #[test]
    fn cd_into_file_fails() {
        let (_dir, mut session) = session();
        std::fs::write(session.root().path().join("f.txt"), "x").unwrap();

        let err = session.cd("f.txt").unwrap_err();
        assert!(matches!(err, Error::NotADirectory(ref p) if p == "/f.txt"));
    }

    #[test]
    fn cd_into_missing_directory_is_not_found() {
        let (_dir, mut session) = session();
        let err = session.cd("ghost").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn repair_cwd_climbs_to_existing_ancestor() {
        let (_dir, mut session) = session();
        std::fs::create_dir_all(session.root().path().join("a/b/c")).unwrap();
        session.cd("a/b/c").unwrap();

        std::fs::remove_dir_all(session.root().path().join("a/b")).unwrap();
        session.repair_cwd();

        assert_eq!(session.pwd(), "/a");
    }
}
