//! Sandbox boundary enforcement.
//!
//! This module provides the [`SandboxRoot`] established at startup and the
//! path guard that turns user-supplied path strings into [`ResolvedPath`]s
//! that are guaranteed to lie inside it.

mod resolve;
mod root;

pub use resolve::{FollowMode, ResolvedPath, MAX_SYMLINK_HOPS};
pub use root::SandboxRoot;
