//! Version-control adapter
//!
//! This module provides a trait-based abstraction over the Git operations the
//! tag workflow needs, allowing the workflow to run against a real repository
//! or an in-memory mock.
//!
//! # Overview
//!
//! The primary abstraction is the [Repository] trait. The concrete
//! implementations are:
//!
//! - [repository::Git2Repository]: a real implementation using the `git2` crate
//! - [mock::MockRepository]: an in-memory implementation for tests
//!
//! # Usage
//!
//! ```rust
//! # use rpm_tagger::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> rpm_tagger::Result<()> {
//! if !repo.tag_exists_locally("pkg-2.3.0")? {
//!     println!("tag is free");
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use std::path::PathBuf;

use crate::error::Result;

/// Identity used for commits, tags and changelog entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

/// Common version-control operations used by the tag workflow
///
/// ## Error Handling
///
/// All methods return [crate::error::Result<T>]. Implementations map
/// failures of `commit` to [crate::error::TaggerError::Commit] and failures of
/// `create_tag` to [crate::error::TaggerError::TagCreation]; everything else may
/// surface as [crate::error::TaggerError::Git].
///
/// ## Implementations
///
/// - [Git2Repository](repository::Git2Repository): Real Git implementation using the `git2` crate
/// - [MockRepository](mock::MockRepository): Test implementation with failure injection
pub trait Repository {
    /// Root of the working tree
    fn workdir(&self) -> Option<PathBuf>;

    /// Commit the given paths (absolute or relative to the working tree) on top of HEAD.
    ///
    /// Only the listed paths are staged; anything else already in the index is
    /// committed as-is.
    ///
    /// # Returns
    /// * `Ok(String)` - Hex id of the new commit
    /// * `Err(Commit)` - If staging or committing fails
    fn commit(&self, paths: &[PathBuf], message: &str) -> Result<String>;

    /// Create an annotated tag pointing at HEAD
    ///
    /// # Returns
    /// * `Ok(())` - Success
    /// * `Err(TagCreation)` - If the tag exists already or cannot be written
    fn create_tag(&self, name: &str, message: &str) -> Result<()>;

    /// Delete a local tag
    fn delete_tag(&self, name: &str) -> Result<()>;

    /// Undo the commit at HEAD: move HEAD back to its parent and reset the
    /// index entries for `paths` to the parent's content. The working tree is
    /// left alone.
    fn revert_commit(&self, paths: &[PathBuf]) -> Result<()>;

    /// Overwrite `paths` in the working tree with their content at HEAD
    fn checkout_paths(&self, paths: &[PathBuf]) -> Result<()>;

    fn tag_exists_locally(&self, name: &str) -> Result<bool>;

    /// Whether `remote` advertises `refs/tags/<name>`.
    ///
    /// A missing remote counts as "not present".
    fn tag_exists_remotely(&self, remote: &str, name: &str) -> Result<bool>;

    /// Whether the tag resolves to the commit at HEAD
    fn head_points_to_tag(&self, name: &str) -> Result<bool>;

    /// Hex id of HEAD, or `None` for an unborn branch
    fn head_id(&self) -> Result<Option<String>>;

    /// Name of the checked-out branch, if any
    fn current_branch(&self) -> Result<Option<String>>;

    /// Most recent tag reachable from HEAD whose name starts with `prefix`
    fn latest_tag_with_prefix(&self, prefix: &str) -> Result<Option<String>>;

    /// Subject lines of commits reachable from HEAD but not from `since`,
    /// newest first.
    fn commit_subjects_since(&self, since: Option<&str>) -> Result<Vec<String>>;

    /// Configured user identity
    fn identity(&self) -> Result<Identity>;
}
