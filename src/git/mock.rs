use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::error::{Result, TaggerError};
use crate::git::{Identity, Repository};

/// A commit recorded by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct MockCommit {
    pub id: String,
    pub message: String,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Default)]
struct MockState {
    commits: Vec<MockCommit>,
    /// Tag name -> index into `commits`
    local_tags: HashMap<String, usize>,
    remote_tags: HashSet<String>,
    next_id: u32,
    fail_commit: bool,
    fail_tag: bool,
    fail_remote: bool,
}

/// Mock repository for testing without actual git operations
///
/// Failure injection switches make `commit`, `create_tag` and the remote
/// lookup fail on demand.
pub struct MockRepository {
    workdir: Option<PathBuf>,
    state: RefCell<MockState>,
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        MockRepository {
            workdir: None,
            state: RefCell::new(MockState::default()),
        }
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Add a commit at HEAD
    pub fn add_commit(&self, message: impl Into<String>) -> String {
        let mut state = self.state.borrow_mut();
        push_commit(&mut state, message.into(), Vec::new())
    }

    /// Tag the current HEAD locally
    pub fn add_local_tag(&self, name: impl Into<String>) {
        let mut state = self.state.borrow_mut();
        let head = state.commits.len().saturating_sub(1);
        state.local_tags.insert(name.into(), head);
    }

    /// Make the remote advertise a tag
    pub fn add_remote_tag(&self, name: impl Into<String>) {
        self.state.borrow_mut().remote_tags.insert(name.into());
    }

    pub fn fail_on_commit(&self) {
        self.state.borrow_mut().fail_commit = true;
    }

    pub fn fail_on_tag(&self) {
        self.state.borrow_mut().fail_tag = true;
    }

    pub fn fail_on_remote(&self) {
        self.state.borrow_mut().fail_remote = true;
    }

    pub fn commits(&self) -> Vec<MockCommit> {
        self.state.borrow().commits.clone()
    }

    pub fn local_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.state.borrow().local_tags.keys().cloned().collect();
        tags.sort();
        tags
    }
}

fn push_commit(state: &mut MockState, message: String, paths: Vec<PathBuf>) -> String {
    state.next_id += 1;
    let id = format!("{:040x}", state.next_id);
    state.commits.push(MockCommit {
        id: id.clone(),
        message,
        paths,
    });
    id
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn workdir(&self) -> Option<PathBuf> {
        self.workdir.clone()
    }

    fn commit(&self, paths: &[PathBuf], message: &str) -> Result<String> {
        let mut state = self.state.borrow_mut();
        if state.fail_commit {
            return Err(TaggerError::commit("injected commit failure"));
        }
        Ok(push_commit(&mut state, message.to_string(), paths.to_vec()))
    }

    fn create_tag(&self, name: &str, _message: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_tag {
            return Err(TaggerError::tag_creation("injected tag failure"));
        }
        if state.local_tags.contains_key(name) {
            return Err(TaggerError::tag_creation(format!("tag {} exists", name)));
        }
        let head = state
            .commits
            .len()
            .checked_sub(1)
            .ok_or_else(|| TaggerError::tag_creation("no commit to tag"))?;
        state.local_tags.insert(name.to_string(), head);
        Ok(())
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        self.state.borrow_mut().local_tags.remove(name);
        Ok(())
    }

    fn revert_commit(&self, _paths: &[PathBuf]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.commits.pop().is_none() {
            return Err(TaggerError::Rollback("no commit to revert".to_string()));
        }
        Ok(())
    }

    fn checkout_paths(&self, _paths: &[PathBuf]) -> Result<()> {
        Ok(())
    }

    fn tag_exists_locally(&self, name: &str) -> Result<bool> {
        Ok(self.state.borrow().local_tags.contains_key(name))
    }

    fn tag_exists_remotely(&self, _remote: &str, name: &str) -> Result<bool> {
        let state = self.state.borrow();
        if state.fail_remote {
            return Err(TaggerError::Git(git2::Error::from_str("remote unreachable")));
        }
        Ok(state.remote_tags.contains(name))
    }

    fn head_points_to_tag(&self, name: &str) -> Result<bool> {
        let state = self.state.borrow();
        let head = state.commits.len().checked_sub(1);
        Ok(head.is_some() && state.local_tags.get(name).copied() == head)
    }

    fn head_id(&self) -> Result<Option<String>> {
        Ok(self.state.borrow().commits.last().map(|c| c.id.clone()))
    }

    fn current_branch(&self) -> Result<Option<String>> {
        Ok(Some("main".to_string()))
    }

    fn latest_tag_with_prefix(&self, prefix: &str) -> Result<Option<String>> {
        let state = self.state.borrow();
        let latest = state
            .local_tags
            .iter()
            .filter(|(name, index)| name.starts_with(prefix) && **index < state.commits.len())
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(name, _)| name.clone());
        Ok(latest)
    }

    fn commit_subjects_since(&self, since: Option<&str>) -> Result<Vec<String>> {
        let state = self.state.borrow();
        let start = since
            .and_then(|tag| state.local_tags.get(tag))
            .map(|index| index + 1)
            .unwrap_or(0);
        Ok(state.commits[start.min(state.commits.len())..]
            .iter()
            .rev()
            .map(|c| c.message.lines().next().unwrap_or_default().to_string())
            .collect())
    }

    fn identity(&self) -> Result<Identity> {
        Ok(Identity {
            name: "Mock Packager".to_string(),
            email: "packager@example.com".to_string(),
        })
    }
}
