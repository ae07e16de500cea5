use crate::error::{Result, TagLocation, TaggerError};
use crate::git::Repository;

/// Where a tag name currently lives. Derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagState {
    Untagged,
    LocallyTagged,
    RemotelyTagged,
}

/// Collision check run before any metadata is touched.
pub struct TagGuard<'a, R: Repository + ?Sized> {
    repo: &'a R,
    remote: String,
    offline: bool,
}

impl<'a, R: Repository + ?Sized> TagGuard<'a, R> {
    pub fn new(repo: &'a R, remote: impl Into<String>) -> Self {
        TagGuard {
            repo,
            remote: remote.into(),
            offline: false,
        }
    }

    /// Skip the remote tag namespace
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Classify `tag`. A tag present both locally and remotely reports
    /// [TagState::LocallyTagged].
    pub fn state(&self, tag: &str) -> Result<TagState> {
        if self.repo.tag_exists_locally(tag)? {
            return Ok(TagState::LocallyTagged);
        }
        if !self.offline && self.repo.tag_exists_remotely(&self.remote, tag)? {
            return Ok(TagState::RemotelyTagged);
        }
        Ok(TagState::Untagged)
    }

    /// Fail unless `tag` is free everywhere.
    ///
    /// # Returns
    /// * `Err(WorkingTreeAlreadyAtTag)` - HEAD already carries this tag
    /// * `Err(TagAlreadyExists)` - The tag exists locally or on the remote
    pub fn check_available(&self, tag: &str) -> Result<()> {
        if self.repo.head_points_to_tag(tag)? {
            return Err(TaggerError::WorkingTreeAlreadyAtTag(tag.to_string()));
        }
        match self.state(tag)? {
            TagState::Untagged => {
                log::debug!("tag {} is available", tag);
                Ok(())
            }
            TagState::LocallyTagged => Err(TaggerError::TagAlreadyExists {
                tag: tag.to_string(),
                location: TagLocation::Local,
            }),
            TagState::RemotelyTagged => Err(TaggerError::TagAlreadyExists {
                tag: tag.to_string(),
                location: TagLocation::Remote,
            }),
        }
    }
}
